//! Generated gRPC code for cellstore protobuf definitions.

/// Common types (Cell, TableDescriptor).
pub mod common {
    tonic::include_proto!("cellstore.common");
}

/// Admin service (CreateTable, ListTables, Health).
pub mod admin {
    tonic::include_proto!("cellstore.admin");
}

/// Table service (MutateRow, ReadCell).
pub mod table {
    tonic::include_proto!("cellstore.table");
}
