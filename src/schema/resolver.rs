//! Repository → message structures.
//!
//! Repository definitions reference each other by id. The resolver indexes them once
//! (id → definition) and memoises the resolved member map of every component and group, so
//! a definition shared by many messages is walked once and the result shared via `Arc`.

use log::debug;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use super::field::{
    CodeTable, DuplicatePolicy, FieldDefinition, FieldDefs, FieldKind, GroupField, ScalarField,
    ScalarType,
};
use super::structure::{MessageStructure, Section};
use crate::error::SchemaError;
use crate::repository::{
    CodeSet, ComponentType, FieldType, GroupType, MemberRef, Presence, Repository,
    HEADER_COMPONENT, TRAILER_COMPONENT,
};

/// Resolves every message of `repository`. See [`Resolver`].
pub fn resolve_messages(
    repository: &Repository,
    inline_components: bool,
    policy: DuplicatePolicy,
) -> Result<BTreeMap<String, MessageStructure>, SchemaError> {
    Resolver::new(repository, inline_components, policy).resolve()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum Identity {
    Component(u32),
    Group(u32),
}

pub struct Resolver<'r> {
    repository: &'r Repository,
    inline_components: bool,
    policy: DuplicatePolicy,
    fields: HashMap<u32, &'r FieldType>,
    components: HashMap<u32, &'r ComponentType>,
    groups: HashMap<u32, &'r GroupType>,
    code_sets: HashMap<&'r str, (&'r CodeSet, Arc<CodeTable>)>,
    resolved: HashMap<Identity, Arc<FieldDefs>>,
    visiting: HashSet<Identity>,
}

impl<'r> Resolver<'r> {
    pub fn new(repository: &'r Repository, inline_components: bool, policy: DuplicatePolicy) -> Self {
        let mut fields = HashMap::new();
        for field in &repository.fields {
            fields.entry(field.id).or_insert(field);
        }
        let mut components = HashMap::new();
        for component in &repository.components {
            components.entry(component.id).or_insert(component);
        }
        let mut groups = HashMap::new();
        for group in &repository.groups {
            groups.entry(group.id).or_insert(group);
        }
        let mut code_sets = HashMap::new();
        for code_set in &repository.code_sets {
            code_sets
                .entry(code_set.name.as_str())
                .or_insert_with(|| (code_set, Arc::new(CodeTable::from_codes(&code_set.codes))));
        }
        Self {
            repository,
            inline_components,
            policy,
            fields,
            components,
            groups,
            code_sets,
            resolved: HashMap::new(),
            visiting: HashSet::new(),
        }
    }

    /// Builds header/body/trailer for every declared message name.
    ///
    /// Declarations sharing a name (one per scenario) are merged into one structure; the
    /// MsgType code of the first declaration is used.
    pub fn resolve(mut self) -> Result<BTreeMap<String, MessageStructure>, SchemaError> {
        let mut merged: Vec<(&'r str, &'r str, FieldDefs)> = Vec::new();
        let mut positions: HashMap<&'r str, usize> = HashMap::new();
        let repository = self.repository;

        for message in &repository.messages {
            let at = *positions.entry(message.name.as_str()).or_insert_with(|| {
                merged.push((message.name.as_str(), message.msg_type.as_str(), FieldDefs::new()));
                merged.len() - 1
            });
            for reference in &message.structure {
                for def in self.expand(reference)? {
                    merged[at].2.insert(def, self.policy);
                }
            }
        }

        let mut structures = BTreeMap::new();
        for (name, msg_type, mut body) in merged {
            let header = take_section(&mut body, HEADER_COMPONENT)
                .ok_or_else(|| SchemaError::MissingHeader(name.to_string()))?;
            let trailer = take_section(&mut body, TRAILER_COMPONENT)
                .ok_or_else(|| SchemaError::MissingTrailer(name.to_string()))?;
            debug!(
                "resolved message {} ({}) header={} body={} trailer={}",
                name,
                msg_type,
                header.len(),
                body.len(),
                trailer.len()
            );
            structures.insert(
                name.to_string(),
                MessageStructure {
                    name: name.to_string(),
                    msg_type: msg_type.to_string(),
                    header: Section::new(header),
                    body: Section::new(body),
                    trailer: Section::new(trailer),
                },
            );
        }
        Ok(structures)
    }

    /// One reference becomes zero or more definitions (inlined components hoist children).
    fn expand(&mut self, reference: &MemberRef) -> Result<Vec<FieldDefinition>, SchemaError> {
        match *reference {
            MemberRef::Field { id, presence } => Ok(vec![self.field(id, presence)?]),
            MemberRef::Component { id, presence } => self.component(id, presence),
            MemberRef::Group { id, presence } => Ok(vec![self.group(id, presence)?]),
        }
    }

    fn members(&mut self, references: &[MemberRef]) -> Result<FieldDefs, SchemaError> {
        let mut defs = FieldDefs::new();
        for reference in references {
            for def in self.expand(reference)? {
                defs.insert(def, self.policy);
            }
        }
        Ok(defs)
    }

    fn field_type(&self, id: u32) -> Result<&'r FieldType, SchemaError> {
        self.fields
            .get(&id)
            .copied()
            .ok_or(SchemaError::DanglingReference { kind: "field", id })
    }

    fn field(&mut self, id: u32, presence: Presence) -> Result<FieldDefinition, SchemaError> {
        let field = self.field_type(id)?;
        let (type_name, codes) = match self.code_sets.get(field.type_name.as_str()) {
            Some((code_set, table)) => (code_set.type_name.clone(), Some(Arc::clone(table))),
            None => (field.type_name.clone(), None),
        };
        Ok(FieldDefinition {
            name: field.name.clone(),
            required: presence.is_required(),
            kind: FieldKind::Field(ScalarField {
                tag: field.id,
                scalar: ScalarType::from_type_name(&type_name),
                type_name,
                codes,
            }),
        })
    }

    fn component(&mut self, id: u32, presence: Presence) -> Result<Vec<FieldDefinition>, SchemaError> {
        let component = self
            .components
            .get(&id)
            .copied()
            .ok_or(SchemaError::DanglingReference { kind: "component", id })?;
        let members = self.memoised(Identity::Component(id), &component.members)?;
        let keep_nested = component.name == HEADER_COMPONENT || component.name == TRAILER_COMPONENT;

        if self.inline_components && !keep_nested {
            return Ok(members.iter().cloned().collect());
        }
        Ok(vec![FieldDefinition {
            name: component.name.clone(),
            required: presence.is_required() && members.any_required(),
            kind: FieldKind::Component(members),
        }])
    }

    fn group(&mut self, id: u32, presence: Presence) -> Result<FieldDefinition, SchemaError> {
        let group = self
            .groups
            .get(&id)
            .copied()
            .ok_or(SchemaError::DanglingReference { kind: "group", id })?;
        let counter = self.field_type(group.num_in_group)?;
        let members = self.memoised(Identity::Group(id), &group.members)?;
        let required = presence.is_required() && members.any_required();

        let repeating = FieldDefinition {
            name: counter.name.clone(),
            required,
            kind: FieldKind::Group(GroupField {
                tag: counter.id,
                order: members.wire_order().into(),
                fields: members,
            }),
        };
        if self.inline_components {
            return Ok(repeating);
        }

        let mut wrapped = FieldDefs::new();
        wrapped.insert(repeating, self.policy);
        Ok(FieldDefinition {
            name: group.name.clone(),
            required,
            kind: FieldKind::Component(Arc::new(wrapped)),
        })
    }

    fn memoised(&mut self, identity: Identity, references: &[MemberRef]) -> Result<Arc<FieldDefs>, SchemaError> {
        if let Some(members) = self.resolved.get(&identity) {
            return Ok(Arc::clone(members));
        }
        if !self.visiting.insert(identity) {
            return Err(match identity {
                Identity::Component(id) => SchemaError::CyclicReference { kind: "component", id },
                Identity::Group(id) => SchemaError::CyclicReference { kind: "group", id },
            });
        }
        let members = self.members(references);
        self.visiting.remove(&identity);
        let members = Arc::new(members?);
        self.resolved.insert(identity, Arc::clone(&members));
        Ok(members)
    }
}

fn take_section(body: &mut FieldDefs, component: &str) -> Option<FieldDefs> {
    match body.remove(component)?.kind {
        FieldKind::Component(fields) => Some(Arc::unwrap_or_clone(fields)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{Code, MessageType};

    fn field(id: u32, name: &str, type_name: &str) -> FieldType {
        FieldType { id, name: name.into(), type_name: type_name.into() }
    }

    fn req_field(id: u32) -> MemberRef {
        MemberRef::Field { id, presence: Presence::Required }
    }

    fn opt_field(id: u32) -> MemberRef {
        MemberRef::Field { id, presence: Presence::Optional }
    }

    /// Header (8, 35), trailer (10), an Instrument component, a Parties group and
    /// an OrderQtyData component whose only member is optional.
    fn repository() -> Repository {
        Repository {
            version: "FIX.5.0SP2".into(),
            fields: vec![
                field(8, "BeginString", "String"),
                field(35, "MsgType", "String"),
                field(10, "CheckSum", "String"),
                field(37, "OrderID", "String"),
                field(54, "Side", "SideCodeSet"),
                field(55, "Symbol", "String"),
                field(48, "SecurityID", "String"),
                field(38, "OrderQty", "Qty"),
                field(453, "NoPartyIDs", "NumInGroup"),
                field(448, "PartyID", "String"),
                field(452, "PartyRole", "int"),
            ],
            code_sets: vec![CodeSet {
                name: "SideCodeSet".into(),
                type_name: "char".into(),
                codes: vec![
                    Code { name: "Buy".into(), value: "1".into() },
                    Code { name: "Sell".into(), value: "2".into() },
                ],
            }],
            components: vec![
                ComponentType { id: 1024, name: "StandardHeader".into(), members: vec![req_field(8), req_field(35)] },
                ComponentType { id: 1025, name: "StandardTrailer".into(), members: vec![req_field(10)] },
                ComponentType { id: 1003, name: "Instrument".into(), members: vec![req_field(55), opt_field(48)] },
                ComponentType { id: 1011, name: "OrderQtyData".into(), members: vec![opt_field(38)] },
            ],
            groups: vec![GroupType {
                id: 1012,
                name: "Parties".into(),
                num_in_group: 453,
                members: vec![req_field(448), opt_field(452)],
            }],
            messages: vec![MessageType {
                name: "ExecutionReport".into(),
                msg_type: "8".into(),
                scenario: "base".into(),
                structure: vec![
                    MemberRef::Component { id: 1024, presence: Presence::Required },
                    req_field(37),
                    MemberRef::Group { id: 1012, presence: Presence::Optional },
                    MemberRef::Component { id: 1003, presence: Presence::Required },
                    req_field(54),
                    MemberRef::Component { id: 1011, presence: Presence::Required },
                    MemberRef::Component { id: 1025, presence: Presence::Required },
                ],
            }],
        }
    }

    #[test]
    fn nested_components_keep_their_layer() {
        let structures = resolve_messages(&repository(), false, DuplicatePolicy::LastWins).unwrap();
        let report = &structures["ExecutionReport"];
        assert_eq!(report.msg_type, "8");
        assert_eq!(
            report.body.fields.names().collect::<Vec<_>>(),
            vec!["OrderID", "Parties", "Instrument", "Side", "OrderQtyData"]
        );
        let parties = report.body.fields.get("Parties").unwrap();
        let group = parties.children().unwrap().get("NoPartyIDs").unwrap();
        assert_eq!(group.tag(), 453);
        assert_eq!(&*report.body.order, &[37, 453, 448, 452, 55, 48, 54, 38]);
        assert_eq!(&*report.header.order, &[8, 35]);
        assert_eq!(&*report.trailer.order, &[10]);
    }

    #[test]
    fn inlined_components_hoist_children() {
        let structures = resolve_messages(&repository(), true, DuplicatePolicy::LastWins).unwrap();
        let report = &structures["ExecutionReport"];
        assert_eq!(
            report.body.fields.names().collect::<Vec<_>>(),
            vec!["OrderID", "NoPartyIDs", "Symbol", "SecurityID", "Side", "OrderQty"]
        );
        // header and trailer never inline into the body
        assert_eq!(report.header.fields.names().collect::<Vec<_>>(), vec!["BeginString", "MsgType"]);
        assert_eq!(&*report.body.order, &[37, 453, 448, 452, 55, 48, 54, 38]);
    }

    #[test]
    fn required_propagates_only_through_required_descendants() {
        let structures = resolve_messages(&repository(), false, DuplicatePolicy::LastWins).unwrap();
        let body = &structures["ExecutionReport"].body.fields;
        assert!(body.get("Instrument").unwrap().required);
        assert!(!body.get("OrderQtyData").unwrap().required);
        assert!(!body.get("Parties").unwrap().required);
    }

    #[test]
    fn enumerated_fields_take_code_set_type() {
        let structures = resolve_messages(&repository(), false, DuplicatePolicy::LastWins).unwrap();
        let side = structures["ExecutionReport"].body.fields.get("Side").unwrap();
        match &side.kind {
            FieldKind::Field(field) => {
                assert_eq!(field.type_name, "char");
                assert_eq!(field.codes.as_ref().unwrap().code_for("Sell"), Some("2"));
            }
            other => panic!("expected scalar field, got {:?}", other),
        }
    }

    #[test]
    fn group_layout_knows_delimiter_and_members() {
        let structures = resolve_messages(&repository(), true, DuplicatePolicy::LastWins).unwrap();
        let layout = &structures["ExecutionReport"].body.layout;
        assert!(layout.contains(453));
        assert!(layout.contains(55));
        assert!(!layout.contains(448));
        let parties = layout.group(453).unwrap();
        assert_eq!(parties.delimiter, 448);
        assert!(parties.layout.contains(452));
    }

    #[test]
    fn dangling_reference_is_fatal() {
        let mut repo = repository();
        repo.messages[0].structure.push(req_field(9999));
        let err = resolve_messages(&repo, false, DuplicatePolicy::LastWins).unwrap_err();
        assert_eq!(err, SchemaError::DanglingReference { kind: "field", id: 9999 });
    }

    #[test]
    fn missing_header_is_fatal() {
        let mut repo = repository();
        repo.messages[0].structure.remove(0);
        let err = resolve_messages(&repo, false, DuplicatePolicy::LastWins).unwrap_err();
        assert_eq!(err, SchemaError::MissingHeader("ExecutionReport".into()));
    }

    #[test]
    fn missing_trailer_is_fatal() {
        let mut repo = repository();
        repo.messages[0].structure.pop();
        let err = resolve_messages(&repo, false, DuplicatePolicy::LastWins).unwrap_err();
        assert_eq!(err, SchemaError::MissingTrailer("ExecutionReport".into()));
    }

    #[test]
    fn cyclic_components_are_rejected() {
        let mut repo = repository();
        repo.components[2]
            .members
            .push(MemberRef::Component { id: 1003, presence: Presence::Optional });
        let err = resolve_messages(&repo, false, DuplicatePolicy::LastWins).unwrap_err();
        assert_eq!(err, SchemaError::CyclicReference { kind: "component", id: 1003 });
    }

    #[test]
    fn resolution_is_idempotent() {
        let repo = repository();
        for inline in [false, true] {
            let first = resolve_messages(&repo, inline, DuplicatePolicy::LastWins).unwrap();
            let second = resolve_messages(&repo, inline, DuplicatePolicy::LastWins).unwrap();
            assert_eq!(first, second);
        }
    }

    #[test]
    fn shared_components_resolve_once() {
        let mut repo = repository();
        let mut order = repo.messages[0].clone();
        order.name = "NewOrderSingle".into();
        order.msg_type = "D".into();
        repo.messages.push(order);
        let structures = resolve_messages(&repo, false, DuplicatePolicy::LastWins).unwrap();
        let a = structures["ExecutionReport"].body.fields.get("Instrument").unwrap();
        let b = structures["NewOrderSingle"].body.fields.get("Instrument").unwrap();
        assert_eq!(a, b);
        match (&a.kind, &b.kind) {
            (FieldKind::Component(x), FieldKind::Component(y)) => assert!(Arc::ptr_eq(x, y)),
            _ => panic!("expected components"),
        }
    }

    #[test]
    fn duplicate_names_follow_policy() {
        // explicit optional Symbol after a component holding a required Symbol
        let mut repo = repository();
        repo.messages[0].structure.insert(4, opt_field(55));
        let last = resolve_messages(&repo, true, DuplicatePolicy::LastWins).unwrap();
        let first = resolve_messages(&repo, true, DuplicatePolicy::FirstWins).unwrap();
        let body_last = &last["ExecutionReport"].body.fields;
        let body_first = &first["ExecutionReport"].body.fields;
        assert!(!body_last.get("Symbol").unwrap().required);
        assert!(body_first.get("Symbol").unwrap().required);
        assert_eq!(body_last.names().collect::<Vec<_>>(), body_first.names().collect::<Vec<_>>());
    }

    #[test]
    fn scenario_declarations_merge_by_name() {
        let mut repo = repository();
        let mut traded = repo.messages[0].clone();
        traded.scenario = "traded".into();
        traded.structure.insert(1, opt_field(48));
        repo.messages.push(traded);
        let structures = resolve_messages(&repo, false, DuplicatePolicy::LastWins).unwrap();
        assert_eq!(structures.len(), 1);
        assert!(structures["ExecutionReport"].body.fields.contains("SecurityID"));
    }
}
