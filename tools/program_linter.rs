/// Program Linter: checks a compiled program for authoring mistakes the
/// runtime would silently tolerate.
///
/// Usage: program_linter <program.ron> [--strict]
///
/// With `--strict`, warnings also fail the run.

use sparkdown_engine::core::expr;
use sparkdown_engine::core::graph::{BlockGraph, JumpTarget};
use sparkdown_engine::schema::block::BlockData;
use sparkdown_engine::schema::command::{BranchCheck, CommandParams};
use sparkdown_engine::schema::program::Program;
use rustc_hash::FxHashSet;
use std::path::Path;
use std::process;

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        println!("Usage: program_linter <program.ron> [--strict]");
        process::exit(0);
    }

    let program_path = &args[1];
    let strict = args[2..].iter().any(|a| a == "--strict");

    let program = match Program::load_from_ron(Path::new(program_path)) {
        Ok(program) => program,
        Err(e) => {
            eprintln!("ERROR: Failed to load program: {}", e);
            process::exit(1);
        }
    };

    println!(
        "Loaded {} blocks, {} commands",
        program.blocks.len(),
        program.blocks.iter().map(|b| b.commands.len()).sum::<usize>()
    );

    let (errors, warnings) = lint_program(&program);

    println!("\n=== Program Lint Report ===\n");

    if errors.is_empty() && warnings.is_empty() {
        println!("All checks passed!");
    }

    for warning in &warnings {
        println!("WARNING: {}", warning);
    }

    for error in &errors {
        println!("ERROR: {}", error);
    }

    println!(
        "\nSummary: {} errors, {} warnings",
        errors.len(),
        warnings.len()
    );

    if errors.is_empty() && !(strict && !warnings.is_empty()) {
        process::exit(0);
    } else {
        process::exit(1);
    }
}

fn lint_program(program: &Program) -> (Vec<String>, Vec<String>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    let graph = BlockGraph::new(program);

    let mut targeted: FxHashSet<String> = FxHashSet::default();
    for block in &program.blocks {
        lint_branches(block, &mut errors);
        lint_expressions(block, &mut errors);

        for command in &block.commands {
            match &command.params {
                CommandParams::Jump(params) => match graph.jump_target(&command.id) {
                    Some(JumpTarget::Block(to)) => {
                        targeted.insert(to.to_string());
                    }
                    Some(JumpTarget::Quit) => {}
                    None => errors.push(format!(
                        "{}: jump target '{}' does not resolve",
                        command.id, params.value
                    )),
                },
                CommandParams::Display(params) => {
                    for (i, choice) in params.choices.iter().enumerate() {
                        match graph.choice_target(&command.id, i) {
                            Some(JumpTarget::Block(to)) => {
                                targeted.insert(to.to_string());
                            }
                            Some(JumpTarget::Quit) => {}
                            None => errors.push(format!(
                                "{}: choice '{}' leads to '{}' which does not resolve",
                                command.id, choice.content, choice.section
                            )),
                        }
                    }
                }
                _ => {}
            }
        }
    }

    // Variables a trigger can ever see: declared ones and assignment targets.
    let mut known: FxHashSet<String> = program.variables.iter().map(|v| v.name.clone()).collect();
    for block in &program.blocks {
        known.extend(block.variables.iter().map(|v| v.name.clone()));
        for command in &block.commands {
            if let CommandParams::Evaluate(params) = &command.params {
                if let Some(name) = assigned_name(&params.expression) {
                    known.insert(name);
                }
            }
        }
    }

    for block in &program.blocks {
        for trigger in &block.triggers {
            if !known.contains(trigger) {
                warnings.push(format!(
                    "{}: trigger '{}' is never declared or assigned",
                    block.id, trigger
                ));
            }
        }

        let reachable = block.id == program.root
            || !block.triggers.is_empty()
            || targeted.contains(block.id.as_str());
        if !reachable {
            warnings.push(format!(
                "{}: block is never entered (no jump, choice or trigger)",
                block.id
            ));
        }
    }

    (errors, warnings)
}

/// Conditional groups must open with `if`, close with `end`, and keep
/// `elseif`/`else` inside with at most one trailing `else`.
fn lint_branches(block: &BlockData, errors: &mut Vec<String>) {
    // One entry per open group: whether its `else` was seen.
    let mut open: Vec<bool> = Vec::new();
    for command in &block.commands {
        let Some(check) = command.params.branch_check() else {
            continue;
        };
        match check {
            BranchCheck::If => open.push(false),
            BranchCheck::ElseIf | BranchCheck::Else => match open.last_mut() {
                None => errors.push(format!("{}: {:?} outside of an if group", command.id, check)),
                Some(seen_else) if *seen_else => {
                    errors.push(format!("{}: {:?} after else", command.id, check))
                }
                Some(seen_else) => *seen_else = check == BranchCheck::Else,
            },
            BranchCheck::End => {
                if open.pop().is_none() {
                    errors.push(format!("{}: end without if", command.id));
                }
            }
        }
    }
    if !open.is_empty() {
        errors.push(format!("{}: {} if group(s) never closed", block.id, open.len()));
    }
}

fn lint_expressions(block: &BlockData, errors: &mut Vec<String>) {
    for command in &block.commands {
        let result = match &command.params {
            CommandParams::Branch(params)
                if matches!(params.check, BranchCheck::If | BranchCheck::ElseIf) =>
            {
                expr::check(&params.condition)
            }
            CommandParams::Evaluate(params) => expr::check_statement(&params.expression),
            CommandParams::Return(params) => match &params.value {
                Some(value) => expr::check(value),
                None => Ok(()),
            },
            _ => Ok(()),
        };
        if let Err(e) = result {
            errors.push(format!("{}: {}", command.id, e));
        }
    }
}

/// The variable an evaluate statement writes, if it is an assignment.
fn assigned_name(statement: &str) -> Option<String> {
    let statement = statement.trim();
    let statement = ["var ", "store ", "assign "]
        .iter()
        .find_map(|kw| statement.strip_prefix(kw))
        .unwrap_or(statement);
    let end = statement.find(|c: char| !(c.is_alphanumeric() || c == '_' || c == '.'))?;
    let (name, rest) = statement.split_at(end);
    let rest = rest.trim_start();
    let assigns = (rest.starts_with('=') && !rest.starts_with("=="))
        || ["+=", "-=", "*=", "/=", "%="].iter().any(|op| rest.starts_with(op));
    (assigns && !name.is_empty()).then(|| name.to_string())
}
