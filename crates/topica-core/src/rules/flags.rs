use crate::{
    model::{FieldModel, ViewModel},
    value::Value,
};
use serde::Serialize;

///
/// TypeFlag
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum TypeFlag {
    ReadOnly,
    Updatable,
    Creatable,
    Removable,
    Deletable,
}

impl TypeFlag {
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::ReadOnly => "readOnlyType",
            Self::Updatable => "updatableType",
            Self::Creatable => "creatableType",
            Self::Removable => "removableType",
            Self::Deletable => "deletableType",
        }
    }
}

///
/// ViewFlag
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ViewFlag {
    Hidden,
}

impl ViewFlag {
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Hidden => "hiddenView",
        }
    }
}

///
/// FieldFlag
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum FieldFlag {
    Hidden,
    Traversable,
    Sorted,
    SortedAscending,
    Pageable,
    ReadOnly,
    Editable,
    Creatable,
    Addable,
    Removable,
    Movable,
}

impl FieldFlag {
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Hidden => "hiddenField",
            Self::Traversable => "traversableField",
            Self::Sorted => "sortedField",
            Self::SortedAscending => "sortedAscendingField",
            Self::Pageable => "pageableField",
            Self::ReadOnly => "readOnlyField",
            Self::Editable => "editableField",
            Self::Creatable => "creatableField",
            Self::Addable => "addableField",
            Self::Removable => "removableField",
            Self::Movable => "movableField",
        }
    }
}

///
/// FieldValueFlag
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum FieldValueFlag {
    Addable,
    Removable,
    Movable,
    Editable,
    Storable,
}

impl FieldValueFlag {
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Addable => "addableFieldValue",
            Self::Removable => "removableFieldValue",
            Self::Movable => "movableFieldValue",
            Self::Editable => "editableFieldValue",
            Self::Storable => "storableFieldValue",
        }
    }
}

/// Every flag key a handler entry may list under `flags`.
pub const FLAG_KEYS: [&str; 22] = [
    "readOnlyType",
    "updatableType",
    "creatableType",
    "removableType",
    "deletableType",
    "hiddenView",
    "hiddenField",
    "traversableField",
    "sortedField",
    "sortedAscendingField",
    "pageableField",
    "readOnlyField",
    "editableField",
    "creatableField",
    "addableField",
    "removableField",
    "movableField",
    "addableFieldValue",
    "removableFieldValue",
    "movableFieldValue",
    "editableFieldValue",
    "storableFieldValue",
];

///
/// FlagQuery
///
/// One question put to a handler chain.
///

#[derive(Clone, Copy, Debug)]
pub enum FlagQuery<'a> {
    Type(TypeFlag),
    View(ViewFlag, &'a ViewModel),
    Field(FieldFlag, &'a FieldModel),
    FieldValue(FieldValueFlag, &'a FieldModel, &'a Value),
}

impl<'a> FlagQuery<'a> {
    #[must_use]
    pub const fn key(&self) -> &'static str {
        match self {
            Self::Type(flag) => flag.key(),
            Self::View(flag, _) => flag.key(),
            Self::Field(flag, _) => flag.key(),
            Self::FieldValue(flag, _, _) => flag.key(),
        }
    }

    #[must_use]
    pub const fn field(&self) -> Option<&'a FieldModel> {
        match self {
            Self::Field(_, field) | Self::FieldValue(_, field, _) => Some(*field),
            Self::Type(_) | Self::View(..) => None,
        }
    }

    #[must_use]
    pub const fn value(&self) -> Option<&'a Value> {
        match self {
            Self::FieldValue(_, _, value) => Some(*value),
            _ => None,
        }
    }
}

///
/// FieldFlagSet
///
/// Evaluated field flags for one field of a context.
///

#[allow(clippy::struct_excessive_bools)]
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldFlagSet {
    pub field_id: String,
    pub hidden: bool,
    pub traversable: bool,
    pub sorted: bool,
    pub sorted_ascending: bool,
    pub pageable: bool,
    pub read_only: bool,
    pub editable: bool,
    pub creatable: bool,
    pub addable: bool,
    pub removable: bool,
    pub movable: bool,
}

///
/// ContextFlags
///
/// Evaluated type, view and field flags for a context, in view order.
///

#[allow(clippy::struct_excessive_bools)]
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextFlags {
    pub read_only_type: bool,
    pub updatable_type: bool,
    pub creatable_type: bool,
    pub removable_type: bool,
    pub deletable_type: bool,
    pub hidden_view: bool,
    pub fields: Vec<FieldFlagSet>,
}

impl ContextFlags {
    #[must_use]
    pub fn field(&self, field_id: &str) -> Option<&FieldFlagSet> {
        self.fields.iter().find(|f| f.field_id == field_id)
    }
}
