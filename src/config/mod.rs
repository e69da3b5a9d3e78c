//! Layered configuration.
//!
//! Settings come from up to four tiers, merged field by field:
//! 1. **Defaults** - built into the binary
//! 2. **Project** - `$CWD/task-manager/config.yaml`
//! 3. **User** - `~/.task-manager/config.yaml`
//! 4. **Environment** - `TASK_MANAGER_*` variables
//!
//! ## Environment Variables
//! - `TASK_MANAGER_CONFIG_PATH` - Explicit config file (replaces tiers 2 and 3)
//! - `TASK_MANAGER_DB_PATH` - Database path
//! - `TASK_MANAGER_HOST` - Listen address
//! - `TASK_MANAGER_PORT` - Listen port
//! - `TASK_MANAGER_USER_DIR` - User config dir (default: `~/.task-manager`)
//! - `TASK_MANAGER_PROJECT_DIR` - Project config dir (default: `./task-manager`)

mod loader;
mod merge;
mod types;

pub use loader::{ConfigLoader, ConfigPaths, ConfigTier};
pub use merge::{deep_merge, deep_merge_all};
pub use types::*;
