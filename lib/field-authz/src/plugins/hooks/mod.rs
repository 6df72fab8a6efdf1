pub mod on_field_resolved;
