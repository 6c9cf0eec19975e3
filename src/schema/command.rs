use serde::{Deserialize, Serialize};

use super::reference::{BlockId, CommandId, RefType, Reference, SourceLocation};

/// Which part of a conditional group a branch command is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BranchCheck {
    If,
    ElseIf,
    Else,
    End,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchParams {
    pub check: BranchCheck,
    /// Condition expression. Ignored for `else` and `end`.
    #[serde(default)]
    pub condition: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluateParams {
    /// A statement such as `gold += 10`, `met_ghost = true` or `delete key`.
    pub expression: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JumpParams {
    /// Section path: a name, a dotted path, `^`, `[`, `]`, `>`, `<`,
    /// or `!END` / `!QUIT`.
    pub value: String,
    #[serde(default)]
    pub return_when_finished: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnParams {
    #[serde(default)]
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaitParams {
    /// Seconds to wait. Negative waits never finish on their own.
    pub seconds: f64,
}

/// Screenplay element a display command presents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DisplayKind {
    #[default]
    Action,
    Dialogue,
    Centered,
    Transition,
    Scene,
}

/// One selectable option of a display command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoiceOption {
    pub content: String,
    /// Section path entered when this option is chosen.
    pub section: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DisplayParams {
    #[serde(default)]
    pub kind: DisplayKind,
    /// UI element the text is routed to.
    #[serde(default)]
    pub target: String,
    #[serde(default)]
    pub character: Option<String>,
    #[serde(default)]
    pub parenthetical: Option<String>,
    pub content: String,
    #[serde(default)]
    pub choices: Vec<ChoiceOption>,
    /// Sound assets started when the text appears.
    #[serde(default)]
    pub assets: Vec<String>,
    /// Finish as soon as the text is fully revealed instead of waiting for
    /// a press.
    #[serde(default)]
    pub auto_advance: bool,
    /// Seconds per revealed character. Falls back to the engine default.
    #[serde(default)]
    pub letter_delay: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityParams {
    /// Entity id, may contain `{expr}` interpolations.
    pub entity: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LogSeverity {
    #[default]
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogParams {
    #[serde(default)]
    pub severity: LogSeverity,
    pub message: String,
}

/// The closed set of executable steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CommandParams {
    Branch(BranchParams),
    Evaluate(EvaluateParams),
    Jump(JumpParams),
    Return(ReturnParams),
    Wait(WaitParams),
    Display(DisplayParams),
    Spawn(EntityParams),
    Destroy(EntityParams),
    Log(LogParams),
}

impl CommandParams {
    /// Tag name, also used as the reference `type_id`.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Branch(_) => "Branch",
            Self::Evaluate(_) => "Evaluate",
            Self::Jump(_) => "Jump",
            Self::Return(_) => "Return",
            Self::Wait(_) => "Wait",
            Self::Display(_) => "Display",
            Self::Spawn(_) => "Spawn",
            Self::Destroy(_) => "Destroy",
            Self::Log(_) => "Log",
        }
    }

    /// The branch check, if this is a branch command.
    pub fn branch_check(&self) -> Option<BranchCheck> {
        match self {
            Self::Branch(p) => Some(p.check),
            _ => None,
        }
    }

    pub fn if_(condition: &str) -> Self {
        Self::branch(BranchCheck::If, condition)
    }

    pub fn elseif(condition: &str) -> Self {
        Self::branch(BranchCheck::ElseIf, condition)
    }

    pub fn else_() -> Self {
        Self::branch(BranchCheck::Else, "")
    }

    pub fn end() -> Self {
        Self::branch(BranchCheck::End, "")
    }

    fn branch(check: BranchCheck, condition: &str) -> Self {
        Self::Branch(BranchParams {
            check,
            condition: condition.to_string(),
        })
    }

    pub fn evaluate(expression: &str) -> Self {
        Self::Evaluate(EvaluateParams {
            expression: expression.to_string(),
        })
    }

    /// A tail jump to `value`.
    pub fn jump(value: &str) -> Self {
        Self::Jump(JumpParams {
            value: value.to_string(),
            return_when_finished: false,
        })
    }

    /// A jump that waits for the target to finish before continuing.
    pub fn call(value: &str) -> Self {
        Self::Jump(JumpParams {
            value: value.to_string(),
            return_when_finished: true,
        })
    }

    pub fn ret(value: Option<&str>) -> Self {
        Self::Return(ReturnParams {
            value: value.map(str::to_string),
        })
    }

    pub fn wait(seconds: f64) -> Self {
        Self::Wait(WaitParams { seconds })
    }

    pub fn display(content: &str) -> Self {
        Self::Display(DisplayParams {
            content: content.to_string(),
            ..DisplayParams::default()
        })
    }

    pub fn choice(content: &str, options: &[(&str, &str)]) -> Self {
        Self::Display(DisplayParams {
            content: content.to_string(),
            choices: options
                .iter()
                .map(|(content, section)| ChoiceOption {
                    content: content.to_string(),
                    section: section.to_string(),
                })
                .collect(),
            ..DisplayParams::default()
        })
    }

    pub fn spawn(entity: &str) -> Self {
        Self::Spawn(EntityParams {
            entity: entity.to_string(),
        })
    }

    pub fn destroy(entity: &str) -> Self {
        Self::Destroy(EntityParams {
            entity: entity.to_string(),
        })
    }

    pub fn log(message: &str) -> Self {
        Self::Log(LogParams {
            severity: LogSeverity::Info,
            message: message.to_string(),
        })
    }
}

fn default_wait() -> bool {
    true
}

/// One compiled command. Immutable once compiled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandData {
    pub id: CommandId,
    pub parent: BlockId,
    pub index: usize,
    pub params: CommandParams,
    /// Poll `is_finished` before moving on.
    #[serde(default = "default_wait")]
    pub wait_until_finished: bool,
    #[serde(default)]
    pub source: Option<SourceLocation>,
}

impl CommandData {
    pub fn reference(&self) -> Reference {
        Reference {
            id: self.id.0.clone(),
            parent_id: Some(self.parent.0.clone()),
            ref_type: RefType::Command,
            type_id: self.params.tag().to_string(),
        }
    }
}
