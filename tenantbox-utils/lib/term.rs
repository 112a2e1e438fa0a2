//! Terminal decorations for the command line binaries.

use std::sync::LazyLock;

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// A green checkmark used to mark completed steps.
pub static CHECKMARK: LazyLock<String> =
    LazyLock::new(|| format!("{}", console::style("✓").green()));

/// A yellow warning sign used to mark non-fatal problems.
pub static WARNING_SIGN: LazyLock<String> =
    LazyLock::new(|| format!("{}", console::style("!").yellow()));
