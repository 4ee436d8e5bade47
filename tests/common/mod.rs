//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::sync::Arc;

use aeroevents::appdef::{
    AppDef, AppDefBuilder, CommandDef, ContainerDef, DataKind, DefinitionFile, FieldDef, QName,
    TypeDef, TypeKind, OCCURS_UNBOUNDED, SYS_CONTAINER, SYS_ID, SYS_PARENT_ID,
};
use aeroevents::events::{Event, EventParams, Offset, PartitionId, RawEventParams, WorkspaceId};
use aeroevents::ids::RecordId;
use aeroevents::log::TrustLevel;
use aeroevents::names::Names;
use aeroevents::storage::MemoryBackend;
use aeroevents::{EventStore, StoreConfig};

pub fn qn(entity: &str) -> QName {
    QName::new("test", entity)
}

pub fn definitions() -> DefinitionFile {
    DefinitionFile {
        types: vec![
            TypeDef::new(qn("Order"), TypeKind::Document)
                .with_field(FieldDef::required("title", DataKind::String))
                .with_field(FieldDef::reference("customer", false, vec![qn("Customer")]))
                .with_field(FieldDef::optional("total", DataKind::Float64))
                .with_field(FieldDef::optional("note", DataKind::Bytes))
                .with_container(ContainerDef::new("lines", qn("Line"), 0, OCCURS_UNBOUNDED)),
            TypeDef::new(qn("Line"), TypeKind::Record)
                .with_field(FieldDef::optional("product", DataKind::String))
                .with_field(FieldDef::optional("qty", DataKind::Int32)),
            TypeDef::new(qn("Customer"), TypeKind::Document)
                .with_field(FieldDef::required("name", DataKind::String)),
            TypeDef::new(qn("Settings"), TypeKind::Document)
                .with_field(FieldDef::optional("theme", DataKind::String))
                .as_singleton(),
            TypeDef::new(qn("OrderParams"), TypeKind::Object)
                .with_field(FieldDef::optional("comment", DataKind::String))
                .with_field(FieldDef::reference("order", false, vec![qn("Order")]))
                .with_container(ContainerDef::new("items", qn("Item"), 0, 10)),
            TypeDef::new(qn("Item"), TypeKind::Element)
                .with_field(FieldDef::required("label", DataKind::String))
                .with_field(FieldDef::optional("qty", DataKind::Int64)),
            TypeDef::new(qn("Secret"), TypeKind::Object)
                .with_field(FieldDef::optional("password", DataKind::String)),
            TypeDef::new(qn("Login"), TypeKind::Object)
                .with_field(FieldDef::optional("pin", DataKind::String).verified()),
        ],
        commands: vec![
            CommandDef::new(qn("PlaceOrder"))
                .with_param(qn("OrderParams"))
                .with_unlogged_param(qn("Secret")),
            CommandDef::new(qn("SignIn")).with_param(qn("Login")),
        ],
    }
}

pub fn appdef() -> Arc<AppDef> {
    let file = definitions();
    let mut builder = AppDefBuilder::new();
    for def in file.types {
        builder.add_type(def);
    }
    for cmd in file.commands {
        builder.add_command(cmd);
    }
    Arc::new(builder.build().expect("fixture definitions are valid"))
}

pub fn memory_store(trust: TrustLevel) -> EventStore {
    let app = appdef();
    let names = Arc::new(Names::prepare(&app).expect("names"));
    EventStore::new(
        StoreConfig::default().with_trust_level(trust),
        app,
        names,
        Arc::new(MemoryBackend::new()),
    )
    .expect("store")
}

pub fn params(
    partition: PartitionId,
    plog_offset: Offset,
    workspace: WorkspaceId,
    wlog_offset: Offset,
) -> EventParams {
    EventParams {
        partition,
        plog_offset,
        workspace,
        wlog_offset,
        registered_at: 1_700_000_000_000 + plog_offset as i64,
        sync: None,
    }
}

/// A valid order placement creating an order with two lines and a
/// customer, referenced from the argument by raw ids.
pub fn place_order(store: &EventStore, params: EventParams) -> Event {
    let raw = RawEventParams::new(qn("PlaceOrder"), params, br#"{"order":"new"}"#.to_vec());
    let mut b = store.new_event(raw);

    let arg = b.argument_object();
    arg.put_string("comment", "rush");
    arg.put_record_id("order", RecordId::new(100));
    let item = arg.add_child("items");
    item.put_string("label", "first");
    item.put_int64("qty", 2);
    arg.add_child("items").put_string("label", "second");

    b.unlogged_argument_object()
        .put_string("password", "hunter2");

    let cud = b.cud();
    let customer = cud.create(&qn("Customer"));
    customer.put_record_id(SYS_ID, RecordId::new(101));
    customer.put_string("name", "Ada");

    let order = cud.create(&qn("Order"));
    order.put_record_id(SYS_ID, RecordId::new(100));
    order.put_string("title", "order");
    order.put_record_id("customer", RecordId::new(101));
    order.put_float64("total", 12.5);
    order.put_bytes("note", vec![1u8, 2, 3]);

    for (raw_id, product) in [(102u64, "apple"), (103, "pear")] {
        let line = cud.create(&qn("Line"));
        line.put_record_id(SYS_ID, RecordId::new(raw_id));
        line.put_record_id(SYS_PARENT_ID, RecordId::new(100));
        line.put_string(SYS_CONTAINER, "lines");
        line.put_string("product", product);
        line.put_int32("qty", 1);
    }

    b.build()
}

/// Every record id reachable from the event, with where it was found.
pub fn reachable_ids(event: &Event) -> Vec<(String, RecordId)> {
    let mut ids = Vec::new();
    event.argument_object().walk(&mut |node| {
        ids.push((format!("arg {}", node.qname()), node.id()));
        ids.push((format!("arg {} parent", node.qname()), node.parent_id()));
        for (_, field, value) in node.fields() {
            if let aeroevents::row::FieldValue::RecordId(id) = value {
                ids.push((format!("arg {}.{}", node.qname(), field.name), *id));
            }
        }
    });
    for create in event.cud().creates() {
        ids.push((format!("create {}", create.qname()), create.id()));
        ids.push((format!("create {} parent", create.qname()), create.parent_id()));
        for (_, field, value) in create.fields() {
            if let aeroevents::row::FieldValue::RecordId(id) = value {
                ids.push((format!("create {}.{}", create.qname(), field.name), *id));
            }
        }
    }
    ids
}
