//! Column layouts of the booking tables.
//!
//! A [`ColumnMap`] ties each booking field to a cell position for one schema
//! version. Maps are validated when they are built, so the parser never has
//! to guard against a broken layout.

use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Timestamp,
    RecordId,
    FullName,
    Age,
    Gender,
    Phone,
    Email,
    SocialMedia,
    Branch,
    AppointmentDate,
    AppointmentTime,
    Treatment,
    Area,
    Freebie,
    PaymentMode,
    TotalPrice,
    Agent,
    Status,
    CompanionFullName,
    CompanionAge,
    CompanionGender,
    CompanionPhone,
    CompanionEmail,
    CompanionSocialMedia,
    CompanionTreatment,
    CompanionArea,
    CompanionFreebie,
    Remarks,
    MatchReason,
    MatchedSource,
    MatchedRow,
    EmailNorm,
    PhoneNorm,
    SocialNorm,
    FullNameNorm,
    CompanionFullNameNorm,
    CancellationTime,
    UpdatedAt,
    UpdatedBy,
    LeadSource,
    /// Column kept in the sheet but not interpreted; its cell is carried
    /// through updates untouched.
    Extra(&'static str),
}

impl Column {
    pub fn header(&self) -> &'static str {
        match self {
            Column::Timestamp => "Timestamp",
            Column::RecordId => "Record ID",
            Column::FullName => "Full Name",
            Column::Age => "Age",
            Column::Gender => "Gender",
            Column::Phone => "Contact Number",
            Column::Email => "Email",
            Column::SocialMedia => "Social Media",
            Column::Branch => "Branch",
            Column::AppointmentDate => "Appointment Date",
            Column::AppointmentTime => "Appointment Time",
            Column::Treatment => "Treatment",
            Column::Area => "Area",
            Column::Freebie => "Freebie",
            Column::PaymentMode => "Mode of Payment",
            Column::TotalPrice => "Total Price",
            Column::Agent => "Agent",
            Column::Status => "Status",
            Column::CompanionFullName => "Companion Full Name",
            Column::CompanionAge => "Companion Age",
            Column::CompanionGender => "Companion Gender",
            Column::CompanionPhone => "Companion Contact Number",
            Column::CompanionEmail => "Companion Email",
            Column::CompanionSocialMedia => "Companion Social Media",
            Column::CompanionTreatment => "Companion Treatment",
            Column::CompanionArea => "Companion Area",
            Column::CompanionFreebie => "Companion Freebie",
            Column::Remarks => "Remarks",
            Column::MatchReason => "Match Reason",
            Column::MatchedSource => "Matched Source",
            Column::MatchedRow => "Matched Row",
            Column::EmailNorm => "Email (normalized)",
            Column::PhoneNorm => "Phone (normalized)",
            Column::SocialNorm => "Social (normalized)",
            Column::FullNameNorm => "Full Name (normalized)",
            Column::CompanionFullNameNorm => "Companion Full Name (normalized)",
            Column::CancellationTime => "Cancellation Time",
            Column::UpdatedAt => "Updated At",
            Column::UpdatedBy => "Updated By",
            Column::LeadSource => "Lead Source",
            Column::Extra(label) => label,
        }
    }
}

/// Columns every booking table must carry.
const REQUIRED: &[Column] = &[
    Column::Timestamp,
    Column::RecordId,
    Column::FullName,
    Column::Branch,
    Column::AppointmentDate,
    Column::TotalPrice,
    Column::Status,
];

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SchemaError {
    #[error("{map}: column {column:?} is mapped more than once")]
    DuplicateColumn { map: String, column: Column },

    #[error("{map}: cell index {index} is used by more than one column")]
    DuplicateIndex { map: String, index: usize },

    #[error("{map}: index {index} of {column:?} is outside the {column_count} columns")]
    IndexOutOfRange {
        map: String,
        column: Column,
        index: usize,
        column_count: usize,
    },

    #[error("{map}: required column {column:?} is not mapped")]
    MissingColumn { map: String, column: Column },

    #[error("unsupported schema version {0}")]
    UnsupportedVersion(u32),
}

/// Field-to-cell mapping for one table layout.
#[derive(Debug, Clone)]
pub struct ColumnMap {
    column_count: usize,
    slots: Vec<Option<Column>>,
    index: HashMap<Column, usize>,
}

impl ColumnMap {
    /// Contiguous layout: the n-th column lives in cell n.
    pub fn new(name: &str, columns: Vec<Column>) -> Result<Self, SchemaError> {
        let pairs: Vec<(Column, usize)> = columns.iter().copied().zip(0..).collect();
        Self::from_indices(name, columns.len(), &pairs)
    }

    /// Explicit layout; cells not named by any pair are left uninterpreted.
    pub fn from_indices(
        name: &str,
        column_count: usize,
        pairs: &[(Column, usize)],
    ) -> Result<Self, SchemaError> {
        let mut slots = vec![None; column_count];
        let mut index = HashMap::with_capacity(pairs.len());

        for &(column, at) in pairs {
            if at >= column_count {
                return Err(SchemaError::IndexOutOfRange {
                    map: name.to_string(),
                    column,
                    index: at,
                    column_count,
                });
            }
            if index.insert(column, at).is_some() {
                return Err(SchemaError::DuplicateColumn {
                    map: name.to_string(),
                    column,
                });
            }
            if slots[at].replace(column).is_some() {
                return Err(SchemaError::DuplicateIndex {
                    map: name.to_string(),
                    index: at,
                });
            }
        }

        if let Some(missing) = REQUIRED.iter().find(|c| !index.contains_key(c)) {
            return Err(SchemaError::MissingColumn {
                map: name.to_string(),
                column: *missing,
            });
        }

        Ok(Self {
            column_count,
            slots,
            index,
        })
    }

    pub fn column_count(&self) -> usize {
        self.column_count
    }

    pub fn index_of(&self, column: Column) -> Option<usize> {
        self.index.get(&column).copied()
    }

    pub fn has(&self, column: Column) -> bool {
        self.index.contains_key(&column)
    }

    /// Mapped (column, cell index) pairs in cell order.
    pub fn columns(&self) -> impl Iterator<Item = (Column, usize)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.map(|c| (c, i)))
    }

    pub fn header_row(&self) -> Vec<Value> {
        self.slots
            .iter()
            .map(|slot| Value::String(slot.map(|c| c.header()).unwrap_or_default().to_string()))
            .collect()
    }

    // ------------------------------------------------------------------
    // Presets
    // ------------------------------------------------------------------

    /// Staging table written by the booking form.
    pub fn intake() -> Result<Self, SchemaError> {
        use Column::*;
        let mut columns = vec![
            Timestamp, RecordId, FullName, Age, Gender, Phone, Email, SocialMedia, Branch,
            AppointmentDate, AppointmentTime, Treatment, Area, Freebie, PaymentMode, TotalPrice,
            Agent, Status,
        ];
        columns.extend(companion_columns(true));
        columns.extend([Remarks, MatchReason, MatchedSource, MatchedRow]);
        Self::new("intake", columns)
    }

    pub fn master_v37() -> Result<Self, SchemaError> {
        Self::new("master_v37", master_base(true))
    }

    /// v43 drops the social handle columns and adds audit and lead columns.
    pub fn master_v43() -> Result<Self, SchemaError> {
        Self::new("master_v43", master_v43_columns())
    }

    pub fn master_v44() -> Result<Self, SchemaError> {
        let mut columns = master_v43_columns();
        columns.push(Column::Extra("Attending Doctor"));
        Self::new("master_v44", columns)
    }

    pub fn for_schema_version(version: u32) -> Result<Self, SchemaError> {
        match version {
            37 => Self::master_v37(),
            43 => Self::master_v43(),
            44 => Self::master_v44(),
            other => Err(SchemaError::UnsupportedVersion(other)),
        }
    }
}

fn companion_columns(with_social: bool) -> Vec<Column> {
    use Column::*;
    let mut columns = vec![
        CompanionFullName, CompanionAge, CompanionGender, CompanionPhone, CompanionEmail,
    ];
    if with_social {
        columns.push(CompanionSocialMedia);
    }
    columns.extend([CompanionTreatment, CompanionArea, CompanionFreebie]);
    columns
}

fn master_base(with_social: bool) -> Vec<Column> {
    use Column::*;
    let mut columns = vec![Timestamp, RecordId, FullName, Age, Gender, Phone, Email];
    if with_social {
        columns.push(SocialMedia);
    }
    columns.extend([
        Branch, AppointmentDate, AppointmentTime, Treatment, Area, Freebie, PaymentMode,
        TotalPrice, Agent, Status,
    ]);
    columns.extend(companion_columns(with_social));
    columns.extend([Remarks, MatchReason, MatchedSource, MatchedRow, EmailNorm, PhoneNorm]);
    if with_social {
        columns.push(SocialNorm);
    }
    columns.extend([FullNameNorm, CompanionFullNameNorm, CancellationTime]);
    columns
}

fn master_v43_columns() -> Vec<Column> {
    use Column::*;
    let mut columns = master_base(false);
    columns.extend([
        UpdatedAt,
        UpdatedBy,
        LeadSource,
        Extra("Promo Code"),
        Extra("Referred By"),
        Extra("Follow Up Date"),
        Extra("Follow Up Notes"),
        Extra("Consent Signed"),
        Extra("Campaign"),
    ]);
    columns
}
