//! Graphviz 导出。
use std::fmt::Write as FmtWrite;
use std::fs;
use std::path::Path;

use crate::net::model::Net;
use crate::net::structure::{ArcKind, TransitionKind};

impl Net {
    pub fn to_dot(&self) -> String {
        let mut dot = String::new();
        let _ = writeln!(&mut dot, "digraph PetriNet {{");
        let _ = writeln!(&mut dot, "    rankdir=LR;");
        let _ = writeln!(&mut dot, "    node [fontname=\"Helvetica\"];");

        for place in self.places() {
            let tokens = self.marking.tokens(place.id);
            let bound = place
                .capacity
                .map(|capacity| capacity.to_string())
                .unwrap_or_else(|| "∞".to_string());
            let label = format!("{}\\n{}/{}", escape_label(&place.label), tokens, bound);
            let _ = writeln!(
                &mut dot,
                "    {} [label=\"{}\", shape=circle, style=filled, fillcolor=\"#e3f2fd\"];",
                place.id, label
            );
        }

        for transition in self.transitions() {
            let (fill, detail) = match transition.kind {
                TransitionKind::Immediate => ("#ffe0b2", format!("prio {}", transition.priority)),
                TransitionKind::Timed => (
                    "#c8e6c9",
                    format!("prio {}, mean {}", transition.priority, transition.delay_mean),
                ),
            };
            let _ = writeln!(
                &mut dot,
                "    {} [label=\"{}\\n{}\", shape=box, style=filled, fillcolor=\"{}\"];",
                transition.id,
                escape_label(&transition.label),
                detail,
                fill
            );
        }

        for arc in self.arcs() {
            let mut attrs = Vec::new();
            if arc.weight != 1 {
                attrs.push(format!("label=\"{}\"", arc.weight));
            }
            match arc.kind {
                ArcKind::Normal => {}
                ArcKind::Inhibitor => attrs.push("arrowhead=odot".to_string()),
                ArcKind::Reset => attrs.push("style=dashed, arrowhead=diamond".to_string()),
            }
            let _ = write!(&mut dot, "    {} -> {}", arc.source, arc.target);
            if attrs.is_empty() {
                let _ = writeln!(&mut dot, ";");
            } else {
                let _ = writeln!(&mut dot, " [{}];", attrs.join(", "));
            }
        }

        let _ = writeln!(&mut dot, "}}");
        dot
    }

    pub fn write_dot<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_dot())
    }
}

pub(crate) fn escape_label(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '"' => escaped.push_str("\\\""),
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
