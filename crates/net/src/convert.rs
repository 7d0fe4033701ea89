//! Conversions between proto types and domain types, plus the mapping from
//! storage errors onto gRPC status codes.

use cellstore_common::{Cell, TableSpec};
use cellstore_proto::common as pb;
use cellstore_store::StoreError;

// ---------------------------------------------------------------------------
// Cell
// ---------------------------------------------------------------------------

pub fn cell_to_proto(cell: &Cell) -> pb::Cell {
    pb::Cell {
        value: cell.value.clone(),
        timestamp_ms: cell.timestamp_ms,
    }
}

pub fn cell_from_proto(proto: pb::Cell) -> Cell {
    Cell {
        value: proto.value,
        timestamp_ms: proto.timestamp_ms,
    }
}

// ---------------------------------------------------------------------------
// TableSpec / TableDescriptor
// ---------------------------------------------------------------------------

pub fn table_spec_to_proto(spec: &TableSpec) -> pb::TableDescriptor {
    pb::TableDescriptor {
        name: spec.name.clone(),
        families: spec.families.iter().cloned().collect(),
    }
}

pub fn table_spec_from_proto(proto: pb::TableDescriptor) -> TableSpec {
    TableSpec::new(proto.name, proto.families)
}

// ---------------------------------------------------------------------------
// StoreError -> gRPC status
// ---------------------------------------------------------------------------

/// Map a storage failure onto the status code the client error mapping
/// expects: duplicate table is ALREADY_EXISTS, missing table/family is
/// NOT_FOUND, ill-formed input is INVALID_ARGUMENT, everything else
/// (WAL, I/O) is INTERNAL.
pub fn store_error_to_status(err: StoreError) -> tonic::Status {
    match &err {
        StoreError::TableExists(_) => tonic::Status::already_exists(err.to_string()),
        StoreError::TableNotFound(_) | StoreError::FamilyNotFound { .. } => {
            tonic::Status::not_found(err.to_string())
        }
        StoreError::InvalidSpec(_) | StoreError::InvalidMutation(_) => {
            tonic::Status::invalid_argument(err.to_string())
        }
        StoreError::Wal(_) | StoreError::Io(_) => tonic::Status::internal(err.to_string()),
    }
}
