//! Semantic validation of wire messages against the scenario they claim to follow.
//!
//! The codec calls a [`Validator`] with the message name, the scenario and the wire form.
//! [`PresenceValidator`] checks the repository's presence rules (required and forbidden
//! members) and code-set membership of enumerated fields in the message body.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use thiserror::Error;

use crate::error::SchemaError;
use crate::fix::{FieldMap, WireMessage};
use crate::repository::{
    ComponentType, FieldType, GroupType, MemberRef, Presence, Repository, HEADER_COMPONENT,
    TRAILER_COMPONENT,
};
use crate::schema::CodeTable;

/// A message broke the rules of its scenario.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationFailure {
    pub msg_type: String,
    /// Offending tags in the order they were found.
    pub tags: Vec<u32>,
    pub scenario: String,
    /// One line per offending tag.
    pub details: Vec<String>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidatorError {
    #[error("{} failed validation in scenario {}: {}", .0.msg_type, .0.scenario, .0.details.join("; "))]
    Failure(ValidationFailure),

    /// The validator could not run, e.g. the scenario is not declared for the message.
    #[error("{0}")]
    Internal(String),
}

/// Pluggable semantic validation.
pub trait Validator: Send + Sync {
    fn validate(&self, message_name: &str, scenario: &str, message: &WireMessage) -> Result<(), ValidatorError>;
}

/// Accepts everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoValidation;

impl Validator for NoValidation {
    fn validate(&self, _: &str, _: &str, _: &WireMessage) -> Result<(), ValidatorError> {
        Ok(())
    }
}

#[derive(Clone, Debug)]
enum Rule {
    Field {
        tag: u32,
        presence: Presence,
        codes: Option<Arc<CodeTable>>,
    },
    Group {
        tag: u32,
        presence: Presence,
        rules: Arc<[Rule]>,
    },
}

/// Presence and code-set rules per `(message name, scenario)`.
///
/// Components are flattened into their parent's rules since they have no wire boundary.
/// StandardHeader and StandardTrailer are session-level and not checked.
#[derive(Clone, Debug, Default)]
pub struct PresenceValidator {
    rules: HashMap<(String, String), Arc<[Rule]>>,
}

impl PresenceValidator {
    pub fn new(repository: &Repository) -> Result<Self, SchemaError> {
        let mut builder = RuleBuilder::new(repository);
        let mut rules: HashMap<(String, String), Arc<[Rule]>> = HashMap::new();
        for message in &repository.messages {
            let message_rules = builder.rules(&message.structure)?;
            rules.insert((message.name.clone(), message.scenario.clone()), message_rules.into());
        }
        Ok(Self { rules })
    }

    pub fn scenarios(&self, message_name: &str) -> Vec<&str> {
        let mut scenarios: Vec<&str> = self
            .rules
            .keys()
            .filter(|(name, _)| name == message_name)
            .map(|(_, scenario)| scenario.as_str())
            .collect();
        scenarios.sort_unstable();
        scenarios
    }
}

impl Validator for PresenceValidator {
    fn validate(&self, message_name: &str, scenario: &str, message: &WireMessage) -> Result<(), ValidatorError> {
        let rules = self
            .rules
            .get(&(message_name.to_string(), scenario.to_string()))
            .ok_or_else(|| {
                ValidatorError::Internal(format!(
                    "No scenario {} for message: {}",
                    scenario, message_name
                ))
            })?;

        let mut failure = ValidationFailure {
            msg_type: message_name.to_string(),
            tags: Vec::new(),
            scenario: scenario.to_string(),
            details: Vec::new(),
        };
        check(rules, &message.body, &mut failure);

        if failure.tags.is_empty() {
            Ok(())
        } else {
            Err(ValidatorError::Failure(failure))
        }
    }
}

fn check(rules: &[Rule], map: &FieldMap, failure: &mut ValidationFailure) {
    for rule in rules {
        match rule {
            Rule::Field { tag, presence, codes } => match (map.get(*tag), presence) {
                (None, Presence::Required) => {
                    failure.tags.push(*tag);
                    failure.details.push(format!("Missing required field {}", tag));
                }
                (Some(_), Presence::Forbidden) => {
                    failure.tags.push(*tag);
                    failure.details.push(format!("Forbidden field {} is present", tag));
                }
                (Some(value), _) => {
                    if let Some(codes) = codes {
                        if !codes.contains_code(value) {
                            failure.tags.push(*tag);
                            failure
                                .details
                                .push(format!("Value '{}' of field {} is not in its code set", value, tag));
                        }
                    }
                }
                (None, _) => {}
            },
            Rule::Group { tag, presence, rules } => {
                let repetitions = map.groups(*tag);
                match (repetitions.is_empty(), presence) {
                    (true, Presence::Required) => {
                        failure.tags.push(*tag);
                        failure.details.push(format!("Missing required group {}", tag));
                    }
                    (false, Presence::Forbidden) => {
                        failure.tags.push(*tag);
                        failure.details.push(format!("Forbidden group {} is present", tag));
                    }
                    _ => {}
                }
                for repetition in repetitions {
                    check(rules, repetition, failure);
                }
            }
        }
    }
}

/// Id-indexed view of the repository; the first declaration of an id wins.
struct RuleBuilder<'r> {
    fields: HashMap<u32, &'r FieldType>,
    components: HashMap<u32, &'r ComponentType>,
    groups: HashMap<u32, &'r GroupType>,
    code_tables: HashMap<&'r str, Arc<CodeTable>>,
    group_rules: HashMap<u32, Arc<[Rule]>>,
    visiting: HashSet<(&'static str, u32)>,
}

impl<'r> RuleBuilder<'r> {
    fn new(repository: &'r Repository) -> Self {
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
        let mut code_tables = HashMap::new();
        for set in &repository.code_sets {
            code_tables
                .entry(set.name.as_str())
                .or_insert_with(|| Arc::new(CodeTable::from_codes(&set.codes)));
        }
        Self {
            fields,
            components,
            groups,
            code_tables,
            group_rules: HashMap::new(),
            visiting: HashSet::new(),
        }
    }

    fn rules(&mut self, members: &[MemberRef]) -> Result<Vec<Rule>, SchemaError> {
        let mut rules = Vec::new();
        for member in members {
            self.member(member, &mut rules)?;
        }
        Ok(rules)
    }

    fn member(&mut self, member: &MemberRef, rules: &mut Vec<Rule>) -> Result<(), SchemaError> {
        match *member {
            MemberRef::Field { id, presence } => {
                let field = *self
                    .fields
                    .get(&id)
                    .ok_or(SchemaError::DanglingReference { kind: "field", id })?;
                rules.push(Rule::Field {
                    tag: id,
                    presence,
                    codes: self.code_tables.get(field.type_name.as_str()).cloned(),
                });
            }
            MemberRef::Component { id, .. } => {
                let component = *self
                    .components
                    .get(&id)
                    .ok_or(SchemaError::DanglingReference { kind: "component", id })?;
                if component.name == HEADER_COMPONENT || component.name == TRAILER_COMPONENT {
                    return Ok(());
                }
                self.enter("component", id, |builder| {
                    for child in &component.members {
                        builder.member(child, rules)?;
                    }
                    Ok(())
                })?;
            }
            MemberRef::Group { id, presence } => {
                let group = *self
                    .groups
                    .get(&id)
                    .ok_or(SchemaError::DanglingReference { kind: "group", id })?;
                let group_rules = match self.group_rules.get(&id) {
                    Some(cached) => Arc::clone(cached),
                    None => {
                        let built: Arc<[Rule]> = self
                            .enter("group", id, |builder| builder.rules(&group.members))?
                            .into();
                        self.group_rules.insert(id, Arc::clone(&built));
                        built
                    }
                };
                rules.push(Rule::Group {
                    tag: group.num_in_group,
                    presence,
                    rules: group_rules,
                });
            }
        }
        Ok(())
    }

    /// Runs `f` with the definition marked as in progress, rejecting re-entry.
    fn enter<T>(
        &mut self,
        kind: &'static str,
        id: u32,
        f: impl FnOnce(&mut Self) -> Result<T, SchemaError>,
    ) -> Result<T, SchemaError> {
        if !self.visiting.insert((kind, id)) {
            return Err(SchemaError::CyclicReference { kind, id });
        }
        let result = f(self);
        self.visiting.remove(&(kind, id));
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{Code, CodeSet, MessageType};

    fn field(id: u32, name: &str, type_name: &str) -> FieldType {
        FieldType { id, name: name.into(), type_name: type_name.into() }
    }

    fn repository() -> Repository {
        Repository {
            version: "FIX.5.0SP2".into(),
            fields: vec![
                field(35, "MsgType", "String"),
                field(10, "CheckSum", "String"),
                field(37, "OrderID", "String"),
                field(17, "ExecID", "String"),
                field(54, "Side", "SideCodeSet"),
                field(58, "Text", "String"),
                field(55, "Symbol", "String"),
                field(453, "NoPartyIDs", "NumInGroup"),
                field(448, "PartyID", "String"),
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
                ComponentType {
                    id: 1024,
                    name: "StandardHeader".into(),
                    members: vec![MemberRef::Field { id: 35, presence: Presence::Required }],
                },
                ComponentType {
                    id: 1025,
                    name: "StandardTrailer".into(),
                    members: vec![MemberRef::Field { id: 10, presence: Presence::Required }],
                },
                ComponentType {
                    id: 1003,
                    name: "Instrument".into(),
                    members: vec![MemberRef::Field { id: 55, presence: Presence::Required }],
                },
            ],
            groups: vec![GroupType {
                id: 1012,
                name: "Parties".into(),
                num_in_group: 453,
                members: vec![MemberRef::Field { id: 448, presence: Presence::Required }],
            }],
            messages: vec![
                MessageType {
                    name: "ExecutionReport".into(),
                    msg_type: "8".into(),
                    scenario: "base".into(),
                    structure: vec![
                        MemberRef::Component { id: 1024, presence: Presence::Required },
                        MemberRef::Field { id: 37, presence: Presence::Required },
                        MemberRef::Field { id: 17, presence: Presence::Required },
                        MemberRef::Group { id: 1012, presence: Presence::Optional },
                        MemberRef::Component { id: 1003, presence: Presence::Optional },
                        MemberRef::Field { id: 54, presence: Presence::Required },
                        MemberRef::Field { id: 58, presence: Presence::Forbidden },
                        MemberRef::Component { id: 1025, presence: Presence::Required },
                    ],
                },
                MessageType {
                    name: "ExecutionReport".into(),
                    msg_type: "8".into(),
                    scenario: "traded".into(),
                    structure: vec![
                        MemberRef::Component { id: 1024, presence: Presence::Required },
                        MemberRef::Field { id: 37, presence: Presence::Required },
                        MemberRef::Field { id: 58, presence: Presence::Optional },
                        MemberRef::Component { id: 1025, presence: Presence::Required },
                    ],
                },
            ],
        }
    }

    fn valid_report() -> WireMessage {
        let mut message = WireMessage::default();
        message.header.set(35, "8");
        message.body.set(37, "O-1");
        message.body.set(17, "E-1");
        message.body.set(54, "1");
        message.body.set(55, "INSTR1");
        message.trailer.set(10, "000");
        message
    }

    fn failure(result: Result<(), ValidatorError>) -> ValidationFailure {
        match result {
            Err(ValidatorError::Failure(failure)) => failure,
            other => panic!("expected validation failure, got {:?}", other),
        }
    }

    #[test]
    fn accepts_complete_message() {
        let validator = PresenceValidator::new(&repository()).unwrap();
        assert!(validator.validate("ExecutionReport", "base", &valid_report()).is_ok());
    }

    #[test]
    fn missing_required_field_names_its_tag() {
        let validator = PresenceValidator::new(&repository()).unwrap();
        let mut message = valid_report();
        message.body.remove(37);
        let failure = failure(validator.validate("ExecutionReport", "base", &message));
        assert_eq!(failure.msg_type, "ExecutionReport");
        assert_eq!(failure.tags, vec![37]);
        assert_eq!(failure.scenario, "base");
    }

    #[test]
    fn forbidden_and_out_of_set_values_are_reported() {
        let validator = PresenceValidator::new(&repository()).unwrap();
        let mut message = valid_report();
        message.body.set(58, "not allowed here");
        message.body.set(54, "Z");
        let failure = failure(validator.validate("ExecutionReport", "base", &message));
        assert_eq!(failure.tags, vec![54, 58]);
        assert_eq!(failure.details.len(), 2);
    }

    #[test]
    fn rules_apply_inside_components_and_group_entries() {
        let validator = PresenceValidator::new(&repository()).unwrap();
        let mut message = valid_report();
        message.body.remove(55);
        let mut party = FieldMap::default();
        party.set(452, "3");
        message.body.add_group(453, party);
        let failure = failure(validator.validate("ExecutionReport", "base", &message));
        assert_eq!(failure.tags, vec![448, 55]);
    }

    #[test]
    fn scenario_selects_rule_set() {
        let validator = PresenceValidator::new(&repository()).unwrap();
        let mut message = WireMessage::default();
        message.body.set(37, "O-1");
        message.body.set(58, "fine in this scenario");
        assert!(validator.validate("ExecutionReport", "traded", &message).is_ok());
        assert_eq!(validator.scenarios("ExecutionReport"), vec!["base", "traded"]);
    }

    #[test]
    fn unknown_scenario_is_internal_error() {
        let validator = PresenceValidator::new(&repository()).unwrap();
        let err = validator
            .validate("ExecutionReport", "cancelled", &valid_report())
            .unwrap_err();
        assert_eq!(
            err,
            ValidatorError::Internal("No scenario cancelled for message: ExecutionReport".into())
        );
    }

    #[test]
    fn header_rules_are_not_checked() {
        let validator = PresenceValidator::new(&repository()).unwrap();
        let mut message = valid_report();
        message.header.remove(35);
        message.trailer.remove(10);
        assert!(validator.validate("ExecutionReport", "base", &message).is_ok());
    }

    #[test]
    fn repeated_ids_use_first_declaration() {
        let mut repo = repository();
        repo.fields.push(field(54, "Side", "String"));
        repo.groups.push(GroupType {
            id: 1012,
            name: "Parties".into(),
            num_in_group: 453,
            members: Vec::new(),
        });
        let validator = PresenceValidator::new(&repo).unwrap();
        let mut message = valid_report();
        message.body.set(54, "Z");
        message.body.add_group(453, FieldMap::default());
        let failure = failure(validator.validate("ExecutionReport", "base", &message));
        assert_eq!(failure.tags, vec![448, 54]);
    }

    #[test]
    fn dangling_member_fails_construction() {
        let mut repo = repository();
        repo.messages[0]
            .structure
            .push(MemberRef::Group { id: 77, presence: Presence::Optional });
        let err = PresenceValidator::new(&repo).unwrap_err();
        assert_eq!(err, SchemaError::DanglingReference { kind: "group", id: 77 });
    }

    #[test]
    fn no_validation_accepts_anything() {
        assert!(NoValidation.validate("Anything", "base", &WireMessage::default()).is_ok());
    }
}
