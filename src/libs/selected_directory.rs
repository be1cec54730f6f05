use ormlite::model::Model;
use serde::{Deserialize, Serialize};

/**
 * SelectedDirectory
 * a root the user opted into scanning and playlist eligibility
 */
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Model)]
#[ormlite(table = "selected_directories")]
pub struct SelectedDirectory {
    #[ormlite(primary_key)]
    pub id: String,
    pub directory: String, // Absolute path, unique
}
