use chartcert_core::CHECKS;

use super::super::args::ChecksArgs;
use crate::exit_codes::EXIT_SUCCESS;

pub(crate) fn run(args: ChecksArgs) -> i32 {
    let width = CHECKS.iter().map(|c| c.name.len()).max().unwrap_or(0);
    for check in CHECKS.iter().filter(|c| args.all || c.is_implemented()) {
        let marker = if check.is_implemented() {
            ""
        } else {
            " (not implemented)"
        };
        println!("{:<width$}  {}{}", check.name, check.description, marker);
    }
    EXIT_SUCCESS
}
