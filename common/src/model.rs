use serde::{Deserialize, Serialize};

/// The metadata record associated with a path: its ordered block list plus
/// the bookkeeping fields callers may attach. The MDS itself never looks
/// inside this — to the Metadata Store it is just an opaque JSON value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct FileMeta {
    pub blocks: Vec<String>,
    pub size: u64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub mime: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub filename: Option<String>,
}
