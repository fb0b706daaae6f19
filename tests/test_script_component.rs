//! Integration tests for script hooks hosted by the component factory

use flowmap::builders::{EntityDataBuilder, MessageBuilder, ModelBuilder};
use flowmap::runtime::script::{self, ScriptHelper, ScriptScope};
use flowmap::runtime::{
    CollectingCallback, ComponentContext, ComponentDefinition, ComponentFactory, DataSource, Directory,
    LocalDirectory, MemoryExecutionTracker, ResourceRuntime, ScriptComponent, ScriptHooks,
};
use flowmap::runtime::tracker::LogLevel;
use flowmap::{ComponentError, ComponentRuntime, FieldValue, FlowStep, Message, Model, Result};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::io::{Read, Write};
use std::sync::{Arc, Mutex};

fn model() -> Model {
    ModelBuilder::new("orders")
        .with_entity("ORDER", |e| e.with_attribute_id("O1", "id").with_attribute_id("O2", "total"))
        .with_entity("AUDIT", |e| e.with_attribute_id("X1", "checked"))
        .build()
        .unwrap()
}

/// Marks every order as checked and writes a summary file at the end.
#[derive(Default)]
struct AuditHooks {
    totals: Vec<f64>,
}

impl ScriptHooks for AuditHooks {
    fn on_init(&mut self, helper: &mut ScriptHelper) -> Result<()> {
        helper.info("audit ready");
        Ok(())
    }

    fn on_handle(&mut self, scope: &mut ScriptScope<'_>) -> Result<()> {
        let count = scope.input_message().and_then(|m| m.payload()).map_or(0, Vec::len);

        let mut rows = Vec::new();
        while let Some(row) = scope.next_entity_data()? {
            rows.push(row.clone());
        }
        for row in &mut rows {
            if let Some(FieldValue::Float(total)) = scope.attribute_value("ORDER", "total", row)? {
                self.totals.push(*total);
            }
            scope.put_attribute_value("AUDIT", "checked", row, true)?;
        }

        if let Some(payload) = scope.input_message_mut().and_then(|m| m.payload_mut()) {
            *payload = rows;
        }
        scope.forward_message_with_parameter("audited", count as i64)
    }

    fn on_success(&mut self, scope: &mut ScriptScope<'_>) -> Result<()> {
        let directory = scope.directory()?;
        let mut file = directory.write("summary.txt", false)?;
        writeln!(file, "orders={} total={}", self.totals.len(), self.totals.iter().sum::<f64>())?;
        scope.send_control_message()
    }
}

#[test]
fn test_script_registered_in_factory() {
    let out = tempfile::tempdir().unwrap();
    let directory = Arc::new(LocalDirectory::new(out.path()));
    let tracker = Arc::new(MemoryExecutionTracker::new());

    let mut factory = ComponentFactory::default();
    factory.register(ComponentDefinition::new("Audit", "SCRIPT"), || {
        ScriptComponent::new(AuditHooks::default())
    });
    let mut component = factory.create("Audit").unwrap();

    let context = ComponentContext::new(FlowStep::new("audit", "Audit"))
        .with_input_model(model())
        .with_resource(ResourceRuntime::directory("out", directory.clone()))
        .with_tracker(tracker.clone());
    component.start(context).unwrap();

    let message = MessageBuilder::new("reader")
        .with_payload(vec![
            EntityDataBuilder::new().with_kv("O1", 1i64).with_kv("O2", 10.5).build(),
            EntityDataBuilder::new().with_kv("O1", 2i64).with_kv("O2", 4.5).build(),
        ])
        .build();

    let mut callback = CollectingCallback::new();
    component.handle(&message, &mut callback).unwrap();
    component.flow_completed(&mut callback).unwrap();

    assert_eq!(component.component_type(), script::TYPE);
    assert_eq!(callback.len(), 2);

    let forwarded = &callback.messages()[0];
    assert_eq!(forwarded.header().get("audited"), Some(&json!(2)));
    let payload = forwarded.payload().unwrap();
    assert!(payload.iter().all(|row| row.get("X1") == Some(&FieldValue::Bool(true))));
    assert!(callback.messages()[1].is_control());

    let mut summary = String::new();
    directory.read("summary.txt").unwrap().read_to_string(&mut summary).unwrap();
    assert_eq!(summary.trim(), "orders=2 total=15");

    let logs = tracker.logs();
    assert_eq!(logs[0].level, LogLevel::Info);
    assert_eq!(logs[0].message, "audit ready");
}

struct StaticSource {
    executed: Mutex<Vec<String>>,
}

impl DataSource for StaticSource {
    fn execute(&self, sql: &str) -> Result<usize> {
        self.executed.lock().unwrap().push(sql.to_string());
        Ok(1)
    }

    fn query(&self, _sql: &str) -> Result<Vec<Value>> {
        Ok(vec![json!({"id": 1, "name": "Ann"})])
    }
}

#[test]
fn test_script_uses_data_source() {
    let source = Arc::new(StaticSource {
        executed: Mutex::new(Vec::new()),
    });

    let mut component = ScriptComponent::new(|scope: &mut ScriptScope<'_>| -> Result<()> {
        let source = scope.data_source()?;
        let rows = source.query("SELECT id, name FROM customer")?;
        source.execute("UPDATE customer SET seen = true")?;
        scope
            .script_context_mut()
            .insert("rows".to_string(), Value::from(rows.len()));
        Ok(())
    });
    let context = ComponentContext::new(FlowStep::new("sql", script::TYPE))
        .with_resource(ResourceRuntime::data_source("db", source.clone()));

    component.start(context).unwrap();
    component
        .handle(&Message::control(), &mut CollectingCallback::new())
        .unwrap();

    assert_eq!(component.helper().unwrap().script_context()["rows"], json!(1));
    assert_eq!(source.executed.lock().unwrap().len(), 1);
}

#[test]
fn test_script_error_propagates() {
    let mut component = ScriptComponent::new(|scope: &mut ScriptScope<'_>| -> Result<()> {
        scope.directory()?;
        Ok(())
    });

    component
        .start(ComponentContext::new(FlowStep::new("s", script::TYPE)))
        .unwrap();
    let result = component.handle(&Message::control(), &mut CollectingCallback::new());

    assert!(matches!(result, Err(ComponentError::Misconfigured(_))));
}
