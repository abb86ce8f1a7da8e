use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Permissions as the server reports them for a school member.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionsJson {
    pub read_info: bool,
    pub edit_info: bool,
}

/// Whether a member may read or edit a school's info. `None` means unknown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InfoPermissions {
    pub read: Option<bool>,
    pub edit: Option<bool>,
}

impl InfoPermissions {
    pub fn new(read: Option<bool>, edit: Option<bool>) -> Self {
        Self { read, edit }
    }

    pub fn update(&mut self, read: bool, edit: bool) {
        self.read = Some(read);
        self.edit = Some(edit);
    }

    /// Apply a [`PermissionsJson`] object. Returns false and changes nothing
    /// if `json` does not have that shape.
    pub fn update_with_json(&mut self, json: &Value) -> bool {
        match serde_json::from_value::<PermissionsJson>(json.clone()) {
            Ok(p) => {
                self.update(p.read_info, p.edit_info);
                true
            }
            Err(_) => false,
        }
    }

    pub fn to_json(&self) -> Value {
        json!({
            "edit": self.edit,
            "read": self.read,
        })
    }
}

impl From<PermissionsJson> for InfoPermissions {
    fn from(p: PermissionsJson) -> Self {
        Self::new(Some(p.read_info), Some(p.edit_info))
    }
}
