//! Shared test harness modules for the trekmap CLI.

use super::*;

mod helpers;
mod steps;
