//! Jump-index search over a block's flat command list.
//!
//! Branch groups are `if … (elseif …)* (else …)? end` runs inside one
//! block. Nested groups are skipped by tracking `if`/`end` depth.

use crate::schema::command::{BranchCheck, CommandData};

/// A branch kind to stop at, and where to land relative to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JumpMatcher {
    pub check: BranchCheck,
    pub offset: usize,
}

impl JumpMatcher {
    pub const fn new(check: BranchCheck, offset: usize) -> Self {
        Self { check, offset }
    }
}

/// Where a failed `if`/`elseif` goes: the next `elseif` (to test it),
/// past the `else` (into its body), or the group's `end`.
pub const FAILED_CONDITION: [JumpMatcher; 3] = [
    JumpMatcher::new(BranchCheck::ElseIf, 0),
    JumpMatcher::new(BranchCheck::Else, 1),
    JumpMatcher::new(BranchCheck::End, 0),
];

/// Where a finished branch body goes: the group's `end`.
pub const GROUP_END: [JumpMatcher; 1] = [JumpMatcher::new(BranchCheck::End, 0)];

/// Scan forward from `from + 1` for the first branch of the same group
/// matching one of `matchers`.
///
/// With no matchers, returns the index just past the group's `end`.
/// Returns `None` when the group ends (or the list runs out) first.
pub fn next_jump_index(
    from: usize,
    commands: &[CommandData],
    matchers: &[JumpMatcher],
) -> Option<usize> {
    let mut depth = 0usize;
    for (i, command) in commands.iter().enumerate().skip(from + 1) {
        let Some(check) = command.params.branch_check() else {
            continue;
        };
        match check {
            BranchCheck::If => {
                depth += 1;
                continue;
            }
            BranchCheck::End if depth > 0 => {
                depth -= 1;
                continue;
            }
            _ if depth > 0 => continue,
            _ => {}
        }

        if matchers.is_empty() {
            if check == BranchCheck::End {
                return Some(i + 1);
            }
            continue;
        }
        if let Some(m) = matchers.iter().find(|m| m.check == check) {
            return Some(i + m.offset);
        }
        if check == BranchCheck::End {
            return None;
        }
    }
    None
}

/// Linear advance onto `next`. Landing on an `elseif`/`else` means the
/// previous branch body ran to completion, so skip to the group's `end`.
pub fn fallthrough_index(commands: &[CommandData], next: usize) -> usize {
    match commands.get(next).and_then(|c| c.params.branch_check()) {
        Some(BranchCheck::ElseIf) | Some(BranchCheck::Else) => {
            next_jump_index(next, commands, &GROUP_END).unwrap_or(next)
        }
        _ => next,
    }
}
