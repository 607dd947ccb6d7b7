//! Integration tests for the PopMaker front end
//!
//! - agent creation from records, kinds and the reserved `id` column
//! - sampling by household before agent creation
//! - attribute tables
//! - identifier allocation limits
//! - declarative scenarios

use std::sync::Arc;

use popnet::agent::AgentOptions;
use popnet::core::config::{IdStrategy, MakerConfig};
use popnet::core::types::{Record, Value};
use popnet::location::{build_policies, Capacity, LocationPolicy, LocationSpec, PolicyRef};
use popnet::maker::PopMaker;
use popnet::sampling::SampleSpec;
use popnet::scenario::{summarize, Scenario};
use popnet::PopError;

fn person(household: i64, age: i64) -> Record {
    let mut record = Record::new();
    record.insert("household".into(), Value::from(household));
    record.insert("age".into(), Value::from(age));
    record
}

fn survey() -> Vec<Record> {
    vec![
        person(1, 40),
        person(1, 38),
        person(1, 9),
        person(2, 71),
        person(3, 30),
        person(3, 2),
    ]
}

struct Home;

impl LocationPolicy for Home {
    fn type_name(&self) -> &str {
        "Home"
    }
    fn stick_together(&self, agent: &popnet::Agent) -> Option<Value> {
        Some(agent.value("household"))
    }
    fn capacity(&self) -> Capacity {
        Capacity::Size(1)
    }
}

#[test]
fn test_reserved_id_column_rejected() {
    let mut maker = PopMaker::with_seed(1);
    let mut model = maker.new_model();
    let mut record = Record::new();
    record.insert("id".into(), Value::from(5));

    let err = maker
        .create_agents(&mut model, &[record], &AgentOptions::default())
        .unwrap_err();
    assert!(matches!(err, PopError::Configuration(_)));
    assert_eq!(model.agent_count(), 0);
}

#[test]
fn test_household_sample_lives_together() {
    let mut maker = PopMaker::with_seed(2);
    let mut model = maker.new_model();
    let classes: Vec<PolicyRef> = vec![Arc::new(Home)];
    let spec = SampleSpec::units(12, "household");

    let (agents, homes) = maker
        .make(&mut model, &survey(), Some(&spec), &AgentOptions::default(), &classes)
        .unwrap();

    assert!(agents.len() >= 12);
    for home in homes {
        let members = model.agents_of(home);
        let households: Vec<Value> = members
            .iter()
            .map(|a| model.agent(*a).unwrap().value("household"))
            .collect();
        assert!(households.windows(2).all(|w| w[0] == w[1]));

        let original = model.agent(members[0]).unwrap().value("household_original");
        let expected = match original.as_i64() {
            Some(1) => 3,
            Some(3) => 2,
            _ => 1,
        };
        assert_eq!(members.len(), expected);
    }
}

#[test]
fn test_agents_table_excludes_id_and_lists_descriptors() {
    let mut maker = PopMaker::with_seed(3);
    let mut model = maker.new_model();
    let classes: Vec<PolicyRef> = vec![Arc::new(Home)];
    maker
        .make(&mut model, &survey(), None, &AgentOptions::default(), &classes)
        .unwrap();

    let table = maker.agents_table(&model, None).unwrap();
    assert_eq!(table.len(), 6);
    assert_eq!(table.column_names(), vec!["Home", "age", "household"]);
    assert!(table.column("id").is_none());

    let ages = maker.agents_table(&model, Some(&["age"])).unwrap();
    assert_eq!(
        ages.column("age").unwrap(),
        &[40, 38, 9, 71, 30, 2].map(Value::from)[..]
    );
}

#[test]
fn test_kind_taken_from_column() {
    let mut maker = PopMaker::with_seed(4);
    let mut model = maker.new_model();
    let records: Vec<Record> = ["Pupil", "Teacher", "Pupil"]
        .iter()
        .map(|role| {
            let mut record = Record::new();
            record.insert("role".into(), Value::from(*role));
            record
        })
        .collect();

    let options = AgentOptions {
        kind_attribute: Some("role".into()),
        ..AgentOptions::default()
    };
    let agents = maker.create_agents(&mut model, &records, &options).unwrap();
    let kinds: Vec<&str> = agents
        .iter()
        .map(|a| model.agent(*a).unwrap().kind.as_str())
        .collect();
    assert_eq!(kinds, vec!["Pupil", "Teacher", "Pupil"]);
    assert_eq!(model.graph().type_of(agents[1].into()), Some("Teacher"));
}

#[test]
fn test_random_id_space_exhaustion() {
    let config = MakerConfig {
        id_strategy: IdStrategy::Random { space: 3 },
        max_id_attempts: 50,
        ..MakerConfig::default()
    };
    let mut maker = PopMaker::new(config).unwrap();
    let mut model = maker.new_model();

    maker.create_n_agents(&mut model, 3, "Agent").unwrap();
    let err = maker.create_n_agents(&mut model, 1, "Agent").unwrap_err();
    assert!(matches!(err, PopError::Generation { attempts: 50, .. }));
}

#[test]
fn test_declarative_school() {
    let mut school = LocationSpec::named("School");
    school.size = Some(4);
    let mut classroom = LocationSpec::named("Classroom");
    classroom.size = Some(2);
    classroom.split_by = Some("age".into());
    classroom.nest = Some("School".into());
    let classes = build_policies(&[school, classroom]).unwrap();

    let mut maker = PopMaker::with_seed(5);
    let mut model = maker.new_model();
    let records: Vec<Record> = (0..8).map(|i| person(i, 6 + i % 2)).collect();
    maker
        .make(&mut model, &records, None, &AgentOptions::default(), &classes)
        .unwrap();

    let summary = summarize(&model);
    let names: Vec<&str> = summary.iter().map(|s| s.type_name.as_str()).collect();
    assert_eq!(names, vec!["Classroom", "School"]);
    assert_eq!(summary[1].instances, 2);
    assert_eq!(summary[0].members, 8);
    assert!(summary[0].largest <= 2);
}

#[test]
fn test_scenario_melting_classroom() {
    let scenario = Scenario::from_toml_str(
        r#"
        [config]
        seed = 11

        [[records]]
        status = "pupil"
        [[records]]
        status = "pupil"
        [[records]]
        status = "pupil"
        [[records]]
        status = "pupil"
        [[records]]
        status = "teacher"
        [[records]]
        status = "teacher"

        [[locations]]
        name = "Pupils"
        size = 2
        build = false
        filter = { attribute = "status", equals = "pupil" }

        [[locations]]
        name = "Teachers"
        size = 1
        build = false
        filter = { attribute = "status", equals = "teacher" }

        [[locations]]
        name = "Classroom"
        melt = ["Pupils", "Teachers"]
        "#,
    )
    .unwrap();

    let population = scenario.run().unwrap();
    let summary = summarize(&population.model);
    assert_eq!(summary.len(), 1);
    assert_eq!(summary[0].type_name, "Classroom");
    assert_eq!(summary[0].instances, 2);
    assert_eq!((summary[0].smallest, summary[0].largest), (3, 3));
}

#[test]
fn test_demo_scenario_loads() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("demos/school.toml");
    let scenario = Scenario::load(&path).unwrap();
    let population = scenario.run().unwrap();
    assert!(population.model.location_count() > 0);
    assert!(population.model.agent_count() > 0);
}
