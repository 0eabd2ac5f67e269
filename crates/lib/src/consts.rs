/// Maximum number of substitution passes before an expression is rejected.
pub const MAX_EVAL_STEPS: usize = 16;

/// Prefix of variables derived from the process environment.
pub const ENV_VAR_PREFIX: &str = "env_";

/// Value used for built-ins that could not be determined.
pub const UNKNOWN_VALUE: &str = "unknown";

/// Number of hex characters kept from the option table hash.
pub const OPTION_HASH_LEN: usize = 8;

/// Number of hex characters kept from the revision id.
pub const REVISION_LEN: usize = 10;

/// Default name of the emitted build description.
pub const NINJA_FILE: &str = "build.ninja";

/// Default output of the `compdb` action.
pub const COMPDB_FILE: &str = "compile_commands.json";

/// Name of the action every build script must register.
pub const NINJA_ACTION: &str = "ninja";

/// Value stored for an option given on the command line without `=value`.
pub const OPTION_ENABLED: &str = "1";
