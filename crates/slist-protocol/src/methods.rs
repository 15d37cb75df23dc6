//! Method name constants and the operation they select.
//!
//! Each constant is the exact string sent over the wire as the `method`
//! field of a request.

/// All shopping list method names.
pub struct Methods;

impl Methods {
    // ── Shopping list items ─────────────────────────────────────────────
    pub const ITEM_CREATE: &str = "shoppingListItem/create";
    pub const ITEM_READ: &str = "shoppingListItem/read";
    pub const ITEM_UPDATE: &str = "shoppingListItem/update";
    pub const ITEM_DELETE: &str = "shoppingListItem/delete";
    pub const ITEM_LIST: &str = "shoppingListItem/list";
}

/// Namespace shared by every item method.
pub const ITEM_NAMESPACE: &str = "shoppingListItem";

/// Operation selected by a method name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
    List,
}

impl Operation {
    pub const ALL: [Operation; 5] = [
        Operation::Create,
        Operation::Read,
        Operation::Update,
        Operation::Delete,
        Operation::List,
    ];

    /// Resolve a wire method name.
    pub fn from_method(method: &str) -> Option<Self> {
        match method {
            Methods::ITEM_CREATE => Some(Self::Create),
            Methods::ITEM_READ => Some(Self::Read),
            Methods::ITEM_UPDATE => Some(Self::Update),
            Methods::ITEM_DELETE => Some(Self::Delete),
            Methods::ITEM_LIST => Some(Self::List),
            _ => None,
        }
    }

    pub fn method(&self) -> MethodName {
        match self {
            Self::Create => Methods::ITEM_CREATE,
            Self::Read => Methods::ITEM_READ,
            Self::Update => Methods::ITEM_UPDATE,
            Self::Delete => Methods::ITEM_DELETE,
            Self::List => Methods::ITEM_LIST,
        }
    }

    /// Whether the operation addresses a single stored item by id.
    pub fn takes_item_id(&self) -> bool {
        matches!(self, Self::Read | Self::Update | Self::Delete)
    }

    /// Whether the operation changes the collection.
    pub fn is_mutation(&self) -> bool {
        matches!(self, Self::Create | Self::Update | Self::Delete)
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.method())
    }
}

/// Returns true if the given string is a known method.
pub fn is_known_method(method: &str) -> bool {
    Operation::from_method(method).is_some()
}

/// The method name is always a `&str` at the protocol level.
pub type MethodName = &'static str;
