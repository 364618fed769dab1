//! Protobuf descriptors for `ping.v1`, served over gRPC reflection
//!
//! Built by hand to mirror the `prost` structs in [`super`]; field numbers
//! and types must stay in step with the `#[prost(...)]` attributes there.

use super::SERVICE_NAME;
use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::{
    DescriptorProto, FieldDescriptorProto, FileDescriptorProto, FileDescriptorSet,
    MessageOptions, MethodDescriptorProto, ServiceDescriptorProto,
};

/// Name of the schema file as seen by reflection clients
pub const FILE_NAME: &str = "ping/v1/ping.proto";

const PACKAGE: &str = "ping.v1";

/// Descriptor set holding the single `ping.v1` schema file
pub fn file_descriptor_set() -> FileDescriptorSet {
    FileDescriptorSet {
        file: vec![file_descriptor()],
    }
}

fn file_descriptor() -> FileDescriptorProto {
    FileDescriptorProto {
        name: Some(FILE_NAME.to_string()),
        package: Some(PACKAGE.to_string()),
        syntax: Some("proto3".to_string()),
        message_type: vec![content(), ping_request(), ping_response()],
        service: vec![service()],
        ..Default::default()
    }
}

fn content() -> DescriptorProto {
    DescriptorProto {
        name: Some("Content".to_string()),
        field: vec![
            scalar("id", 1, Type::String),
            scalar("data", 2, Type::Bytes),
            map_field("metadata", 3, "Content"),
        ],
        nested_type: vec![string_map_entry()],
        ..Default::default()
    }
}

fn ping_request() -> DescriptorProto {
    DescriptorProto {
        name: Some("PingRequest".to_string()),
        field: vec![
            scalar("sent", 1, Type::Int64),
            message_field("content", 2, &qualified("Content")),
        ],
        ..Default::default()
    }
}

fn ping_response() -> DescriptorProto {
    DescriptorProto {
        name: Some("PingResponse".to_string()),
        field: vec![
            scalar("id", 1, Type::String),
            scalar("payload", 2, Type::Bytes),
            scalar("transformed", 3, Type::String),
            scalar("sequence", 4, Type::Uint64),
            scalar("created_at", 5, Type::Int64),
            map_field("metadata", 6, "PingResponse"),
        ],
        nested_type: vec![string_map_entry()],
        ..Default::default()
    }
}

fn service() -> ServiceDescriptorProto {
    let short_name = SERVICE_NAME.rsplit('.').next().unwrap_or(SERVICE_NAME);
    ServiceDescriptorProto {
        name: Some(short_name.to_string()),
        method: vec![method("Ping", false), method("Stream", true)],
        ..Default::default()
    }
}

fn method(name: &str, streaming: bool) -> MethodDescriptorProto {
    MethodDescriptorProto {
        name: Some(name.to_string()),
        input_type: Some(qualified("PingRequest")),
        output_type: Some(qualified("PingResponse")),
        client_streaming: Some(streaming),
        server_streaming: Some(streaming),
        ..Default::default()
    }
}

/// `map<string, string>` is encoded as a repeated nested entry message
fn string_map_entry() -> DescriptorProto {
    DescriptorProto {
        name: Some("MetadataEntry".to_string()),
        field: vec![scalar("key", 1, Type::String), scalar("value", 2, Type::String)],
        options: Some(MessageOptions {
            map_entry: Some(true),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn scalar(name: &str, number: i32, kind: Type) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_string()),
        json_name: Some(json_name(name)),
        number: Some(number),
        label: Some(Label::Optional as i32),
        r#type: Some(kind as i32),
        ..Default::default()
    }
}

fn message_field(name: &str, number: i32, type_name: &str) -> FieldDescriptorProto {
    FieldDescriptorProto {
        type_name: Some(type_name.to_string()),
        ..scalar(name, number, Type::Message)
    }
}

fn map_field(name: &str, number: i32, parent: &str) -> FieldDescriptorProto {
    FieldDescriptorProto {
        label: Some(Label::Repeated as i32),
        ..message_field(name, number, &qualified(&format!("{parent}.MetadataEntry")))
    }
}

fn qualified(name: &str) -> String {
    format!(".{PACKAGE}.{name}")
}

/// protoc's lowerCamelCase JSON name
fn json_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = false;
    for c in name.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}
