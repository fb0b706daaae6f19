//! Loads the sample flow step and runs it end to end over NDJSON input

use flowmap::runtime::{CollectingCallback, ComponentContext, ComponentFactory};
use flowmap::serialization::{MessageReader, NdjsonWriter};
use flowmap::{ComponentError, FieldValue, FlowStepConfig, Message, Result};
use pretty_assertions::assert_eq;
use std::fs::File;
use std::io::{BufReader, Cursor};
use std::path::PathBuf;

fn sample(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config/flows").join(name)
}

fn run_sample() -> (Vec<Message>, CollectingCallback) {
    let config = FlowStepConfig::load_from_file(sample("customer_mapping.yaml")).unwrap();
    let mut component = ComponentFactory::default().create(&config.step.component).unwrap();
    component.start(ComponentContext::from_config(config)).unwrap();

    let input = BufReader::new(File::open(sample("customer_messages.ndjson")).unwrap());
    let messages: Vec<Message> = MessageReader::new(input).collect::<Result<_>>().unwrap();

    let mut callback = CollectingCallback::new();
    for message in &messages {
        component.handle(message, &mut callback).unwrap();
    }
    component.flow_completed(&mut callback).unwrap();

    (messages, callback)
}

#[test]
fn test_sample_step_loads() {
    let config = FlowStepConfig::load_from_file(sample("customer_mapping.yaml")).unwrap();

    assert_eq!(config.step.component, "Mapping");
    assert_eq!(config.step.attribute_settings.len(), 3);
    let output = config.output_model.unwrap();
    assert_eq!(output.attribute_by_name("ADDRESS", "city").unwrap().id, "wh-addr-city");
}

#[test]
fn test_sample_flow_output() {
    let (input, callback) = run_sample();

    assert_eq!(input.len(), 4);
    // the control message produces nothing
    assert_eq!(callback.len(), 3);

    let first = callback.messages()[0].payload().unwrap();
    assert_eq!(first.len(), 2);
    assert_eq!(first[0].get("wh-cust-id"), Some(&FieldValue::Int(1)));
    assert_eq!(first[0].get("wh-cust-full-name"), Some(&FieldValue::from("Ann Lee")));
    assert_eq!(first[0].get("wh-cust-display-name"), Some(&FieldValue::from("Ann Lee")));
    assert_eq!(first[0].get("wh-addr-city"), Some(&FieldValue::from("Wellington")));
    // notes has no route and no output attribute
    assert_eq!(first[1].len(), 3);

    let second = callback.messages()[1].payload().unwrap();
    assert_eq!(second[0].get("wh-cust-segment"), Some(&FieldValue::Null));

    let last = &callback.messages()[2];
    assert!(last.is_last_of_unit_of_work());
    assert!(last.payload().unwrap().is_empty());
    assert_eq!(last.header().get("file"), Some(&serde_json::json!("crm-2024-01.csv")));
}

#[test]
fn test_forwarded_messages_serialize_as_ndjson() {
    let (_, callback) = run_sample();

    let mut buf = Vec::new();
    let mut writer = NdjsonWriter::new(&mut buf);
    writer.write_all(callback.messages()).unwrap();
    writer.flush().unwrap();

    let reread: Vec<Message> = MessageReader::new(Cursor::new(buf)).collect::<Result<_>>().unwrap();
    assert_eq!(reread.len(), 3);
    assert_eq!(reread[0].payload(), callback.messages()[0].payload());
    assert_eq!(reread[2].header(), callback.messages()[2].header());
}

#[test]
fn test_unknown_component_type() {
    let yaml = r#"
id: sort
component: Sorter
"#;
    let config = FlowStepConfig::from_yaml_str(yaml).unwrap();

    let result = ComponentFactory::default().create(&config.step.component);
    assert!(matches!(result, Err(ComponentError::NotFound(_))));
}
