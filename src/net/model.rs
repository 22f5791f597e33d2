//! 网模型：实体的唯一所有者，所有结构性变更都经由这里完成并在失败时保持原状。
use std::fmt;

use indexmap::IndexMap;

use crate::config::NetConfig;
use crate::net::error::{ArcViolation, NetError};
use crate::net::ids::{ArcId, EntityRef, NodeRef, PlaceId, TransitionId};
use crate::net::structure::{
    Arc, ArcKind, ArcSpec, ArcUpdate, Marking, Place, PlaceSpec, PlaceUpdate, Transition,
    TransitionSpec, TransitionUpdate, Weight,
};

#[derive(Clone)]
pub struct Net {
    pub(crate) places: IndexMap<PlaceId, Place>,
    pub(crate) transitions: IndexMap<TransitionId, Transition>,
    pub(crate) arcs: IndexMap<ArcId, Arc>,
    pub(crate) marking: Marking,
    pub(crate) config: NetConfig,
    next_place: u64,
    next_transition: u64,
    next_arc: u64,
}

impl fmt::Debug for Net {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Net")
            .field("places", &self.places.values().collect::<Vec<_>>())
            .field("transitions", &self.transitions.values().collect::<Vec<_>>())
            .field("arcs", &self.arcs.values().collect::<Vec<_>>())
            .field("marking", &self.marking)
            .finish()
    }
}

impl Default for Net {
    fn default() -> Self {
        Self::empty()
    }
}

impl Net {
    pub fn empty() -> Self {
        Self::with_config(NetConfig::default())
    }

    pub fn with_config(config: NetConfig) -> Self {
        Self {
            places: IndexMap::new(),
            transitions: IndexMap::new(),
            arcs: IndexMap::new(),
            marking: Marking::new(),
            config,
            next_place: 0,
            next_transition: 0,
            next_arc: 0,
        }
    }

    pub fn config(&self) -> &NetConfig {
        &self.config
    }

    pub fn add_place(&mut self, spec: PlaceSpec) -> Result<Place, NetError> {
        let id = PlaceId::new(self.next_place);
        self.insert_place(id, spec)
    }

    pub fn add_transition(&mut self, spec: TransitionSpec) -> Result<Transition, NetError> {
        let id = TransitionId::new(self.next_transition);
        self.insert_transition(id, spec)
    }

    /// 添加弧；违反二部性、方向或权重约束时返回 [`NetError::InvalidArc`]。
    pub fn add_arc(&mut self, spec: ArcSpec) -> Result<Arc, NetError> {
        let id = ArcId::new(self.next_arc);
        self.insert_arc(id, spec)
    }

    pub(crate) fn insert_place(&mut self, id: PlaceId, spec: PlaceSpec) -> Result<Place, NetError> {
        if self.places.contains_key(&id) {
            return Err(NetError::DuplicateId(EntityRef::Place(id)));
        }
        if let Some(capacity) = spec.capacity {
            self.check_manual_tokens(id, spec.tokens, capacity)?;
        }
        let place = Place {
            id,
            label: spec.label,
            capacity: spec.capacity,
            token_color: spec.token_color,
        };
        self.places.insert(id, place.clone());
        self.marking.set(id, spec.tokens);
        self.next_place = self.next_place.max(id.raw().saturating_add(1));
        log::debug!("added place {} ({}) with {} tokens", id, place.label, spec.tokens);
        Ok(place)
    }

    pub(crate) fn insert_transition(
        &mut self,
        id: TransitionId,
        spec: TransitionSpec,
    ) -> Result<Transition, NetError> {
        if self.transitions.contains_key(&id) {
            return Err(NetError::DuplicateId(EntityRef::Transition(id)));
        }
        check_delay(id, spec.delay_mean)?;
        let transition = Transition {
            id,
            label: spec.label,
            kind: spec.kind,
            delay_mean: spec.delay_mean,
            priority: spec.priority,
        };
        self.transitions.insert(id, transition.clone());
        self.next_transition = self.next_transition.max(id.raw().saturating_add(1));
        log::debug!("added transition {} ({})", id, transition.label);
        Ok(transition)
    }

    pub(crate) fn insert_arc(&mut self, id: ArcId, spec: ArcSpec) -> Result<Arc, NetError> {
        if self.arcs.contains_key(&id) {
            return Err(NetError::DuplicateId(EntityRef::Arc(id)));
        }
        self.check_arc(None, spec)?;
        let arc = Arc {
            id,
            source: spec.source,
            target: spec.target,
            weight: spec.weight,
            kind: spec.kind,
        };
        self.arcs.insert(id, arc);
        self.next_arc = self.next_arc.max(id.raw().saturating_add(1));
        log::debug!(
            "added {:?} arc {} {} -> {} (w={})",
            arc.kind,
            id,
            arc.source,
            arc.target,
            arc.weight
        );
        Ok(arc)
    }

    /// 删除库所，同时级联删除所有引用它的弧以及它的标识项。
    pub fn remove_place(&mut self, id: PlaceId) -> Result<Place, NetError> {
        let place = self
            .places
            .shift_remove(&id)
            .ok_or(NetError::UnknownEntity(EntityRef::Place(id)))?;
        self.marking.remove(id);
        let removed = self.remove_arcs_touching(NodeRef::Place(id));
        log::debug!("removed place {} and {} arcs", id, removed);
        Ok(place)
    }

    pub fn remove_transition(&mut self, id: TransitionId) -> Result<Transition, NetError> {
        let transition = self
            .transitions
            .shift_remove(&id)
            .ok_or(NetError::UnknownEntity(EntityRef::Transition(id)))?;
        let removed = self.remove_arcs_touching(NodeRef::Transition(id));
        log::debug!("removed transition {} and {} arcs", id, removed);
        Ok(transition)
    }

    pub fn remove_arc(&mut self, id: ArcId) -> Result<Arc, NetError> {
        let arc = self
            .arcs
            .shift_remove(&id)
            .ok_or(NetError::UnknownEntity(EntityRef::Arc(id)))?;
        log::debug!("removed arc {}", id);
        Ok(arc)
    }

    fn remove_arcs_touching(&mut self, node: NodeRef) -> usize {
        let before = self.arcs.len();
        self.arcs.retain(|_, arc| !arc.touches(node));
        before - self.arcs.len()
    }

    /// 直接覆盖库所的令牌数（编辑器手动修改）。
    ///
    /// Exceeding the capacity is refused unless
    /// [`NetConfig::allow_manual_overfill`] is set.
    pub fn set_tokens(&mut self, id: PlaceId, tokens: Weight) -> Result<(), NetError> {
        let place = self
            .places
            .get(&id)
            .ok_or(NetError::UnknownEntity(EntityRef::Place(id)))?;
        if let Some(capacity) = place.capacity {
            self.check_manual_tokens(id, tokens, capacity)?;
        }
        self.marking.set(id, tokens);
        log::debug!("set tokens of {} to {}", id, tokens);
        Ok(())
    }

    fn check_manual_tokens(
        &self,
        place: PlaceId,
        tokens: Weight,
        capacity: Weight,
    ) -> Result<(), NetError> {
        if tokens > capacity && !self.config.allow_manual_overfill {
            return Err(NetError::CapacityViolation {
                place,
                tokens,
                capacity,
            });
        }
        Ok(())
    }

    pub fn update_place(&mut self, id: PlaceId, update: PlaceUpdate) -> Result<&Place, NetError> {
        if !self.places.contains_key(&id) {
            return Err(NetError::UnknownEntity(EntityRef::Place(id)));
        }
        if let Some(Some(capacity)) = update.capacity {
            self.check_manual_tokens(id, self.marking.tokens(id), capacity)?;
        }
        let place = self
            .places
            .get_mut(&id)
            .ok_or(NetError::UnknownEntity(EntityRef::Place(id)))?;
        if let Some(label) = update.label {
            place.label = label;
        }
        if let Some(capacity) = update.capacity {
            place.capacity = capacity;
        }
        if let Some(color) = update.token_color {
            place.token_color = color;
        }
        Ok(&*place)
    }

    pub fn update_transition(
        &mut self,
        id: TransitionId,
        update: TransitionUpdate,
    ) -> Result<&Transition, NetError> {
        if let Some(delay_mean) = update.delay_mean {
            check_delay(id, delay_mean)?;
        }
        let transition = self
            .transitions
            .get_mut(&id)
            .ok_or(NetError::UnknownEntity(EntityRef::Transition(id)))?;
        if let Some(label) = update.label {
            transition.label = label;
        }
        if let Some(kind) = update.kind {
            transition.kind = kind;
        }
        if let Some(delay_mean) = update.delay_mean {
            transition.delay_mean = delay_mean;
        }
        if let Some(priority) = update.priority {
            transition.priority = priority;
        }
        Ok(&*transition)
    }

    /// 修改弧的权重或类型；修改后的弧重新按插入时的规则校验。
    pub fn update_arc(&mut self, id: ArcId, update: ArcUpdate) -> Result<Arc, NetError> {
        let current = *self
            .arcs
            .get(&id)
            .ok_or(NetError::UnknownEntity(EntityRef::Arc(id)))?;
        let spec = ArcSpec {
            source: current.source,
            target: current.target,
            weight: update.weight.unwrap_or(current.weight),
            kind: update.kind.unwrap_or(current.kind),
        };
        self.check_arc(Some(id), spec)?;
        let arc = self
            .arcs
            .get_mut(&id)
            .ok_or(NetError::UnknownEntity(EntityRef::Arc(id)))?;
        arc.weight = spec.weight;
        arc.kind = spec.kind;
        Ok(*arc)
    }

    /// Copies the place's properties and current tokens under a fresh id. Arcs are not copied.
    pub fn duplicate_place(&mut self, id: PlaceId) -> Result<Place, NetError> {
        let place = self.place(id)?;
        let spec = PlaceSpec {
            label: place.label.clone(),
            tokens: self.marking.tokens(id),
            capacity: place.capacity,
            token_color: place.token_color.clone(),
        };
        self.add_place(spec)
    }

    pub fn duplicate_transition(&mut self, id: TransitionId) -> Result<Transition, NetError> {
        let transition = self.transition(id)?;
        let spec = TransitionSpec {
            label: transition.label.clone(),
            kind: transition.kind,
            delay_mean: transition.delay_mean,
            priority: transition.priority,
        };
        self.add_transition(spec)
    }

    fn check_arc(&self, existing: Option<ArcId>, spec: ArcSpec) -> Result<(), NetError> {
        self.check_node(spec.source)?;
        self.check_node(spec.target)?;
        match (spec.source, spec.target) {
            (NodeRef::Place(_), NodeRef::Transition(_)) => {}
            (NodeRef::Transition(_), NodeRef::Place(_)) => match spec.kind {
                ArcKind::Normal => {}
                ArcKind::Inhibitor | ArcKind::Reset => {
                    return Err(ArcViolation::WrongDirection { kind: spec.kind }.into());
                }
            },
            (NodeRef::Place(_), NodeRef::Place(_))
            | (NodeRef::Transition(_), NodeRef::Transition(_)) => {
                return Err(ArcViolation::SameSide {
                    from: spec.source,
                    to: spec.target,
                }
                .into());
            }
        }
        if spec.weight == 0 {
            return Err(ArcViolation::ZeroWeight.into());
        }
        if self.config.reject_duplicate_arcs {
            let duplicate = self.arcs.values().any(|arc| {
                Some(arc.id) != existing
                    && arc.source == spec.source
                    && arc.target == spec.target
                    && arc.kind == spec.kind
            });
            if duplicate {
                return Err(ArcViolation::Duplicate {
                    from: spec.source,
                    to: spec.target,
                    kind: spec.kind,
                }
                .into());
            }
        }
        Ok(())
    }

    fn check_node(&self, node: NodeRef) -> Result<(), NetError> {
        let known = match node {
            NodeRef::Place(place) => self.places.contains_key(&place),
            NodeRef::Transition(transition) => self.transitions.contains_key(&transition),
        };
        if known {
            Ok(())
        } else {
            Err(NetError::UnknownEntity(node.into()))
        }
    }

    pub fn place(&self, id: PlaceId) -> Result<&Place, NetError> {
        self.places
            .get(&id)
            .ok_or(NetError::UnknownEntity(EntityRef::Place(id)))
    }

    pub fn transition(&self, id: TransitionId) -> Result<&Transition, NetError> {
        self.transitions
            .get(&id)
            .ok_or(NetError::UnknownEntity(EntityRef::Transition(id)))
    }

    pub fn arc(&self, id: ArcId) -> Result<&Arc, NetError> {
        self.arcs
            .get(&id)
            .ok_or(NetError::UnknownEntity(EntityRef::Arc(id)))
    }

    pub fn places(&self) -> impl Iterator<Item = &Place> {
        self.places.values()
    }

    pub fn transitions(&self) -> impl Iterator<Item = &Transition> {
        self.transitions.values()
    }

    pub fn arcs(&self) -> impl Iterator<Item = &Arc> {
        self.arcs.values()
    }

    pub fn places_len(&self) -> usize {
        self.places.len()
    }

    pub fn transitions_len(&self) -> usize {
        self.transitions.len()
    }

    pub fn arcs_len(&self) -> usize {
        self.arcs.len()
    }

    /// 输入弧：target 为 `transition` 的弧（含抑制弧与复位弧）。
    pub fn input_arcs(&self, transition: TransitionId) -> impl Iterator<Item = &Arc> {
        let node = NodeRef::Transition(transition);
        self.arcs.values().filter(move |arc| arc.target == node)
    }

    /// 输出弧：source 为 `transition` 的弧。
    pub fn output_arcs(&self, transition: TransitionId) -> impl Iterator<Item = &Arc> {
        let node = NodeRef::Transition(transition);
        self.arcs.values().filter(move |arc| arc.source == node)
    }

    pub fn arcs_of(&self, node: NodeRef) -> impl Iterator<Item = &Arc> {
        self.arcs.values().filter(move |arc| arc.touches(node))
    }

    pub fn tokens(&self, place: PlaceId) -> Result<Weight, NetError> {
        self.marking
            .get(place)
            .ok_or(NetError::UnknownEntity(EntityRef::Place(place)))
    }

    pub fn marking(&self) -> &Marking {
        &self.marking
    }

    /// 回滚到先前的标识；要求其恰好覆盖当前所有库所。
    ///
    /// Capacities are checked against the current structure, so a capacity lowered
    /// since `marking` was taken rejects the restore unless manual overfill is allowed.
    pub fn restore_marking(&mut self, marking: Marking) -> Result<(), NetError> {
        let covers = marking.len() == self.places.len()
            && self.places.keys().all(|place| marking.contains(*place));
        if !covers {
            return Err(NetError::MarkingMismatch);
        }
        for place in self.places.values() {
            if let Some(capacity) = place.capacity {
                self.check_manual_tokens(place.id, marking.tokens(place.id), capacity)?;
            }
        }
        self.marking = self
            .places
            .keys()
            .map(|place| (*place, marking.tokens(*place)))
            .collect();
        log::debug!("restored marking {:?}", self.marking);
        Ok(())
    }

    /// 由引擎驱动的写入（发生规则），只在 firing 模块中调用。
    pub(crate) fn commit_marking(&mut self, marking: Marking) {
        self.marking = marking;
    }
}

fn check_delay(transition: TransitionId, delay_mean: f64) -> Result<(), NetError> {
    if delay_mean.is_finite() && delay_mean > 0.0 {
        Ok(())
    } else {
        Err(NetError::InvalidDelay {
            transition,
            delay_mean,
        })
    }
}
