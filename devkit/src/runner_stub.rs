/*!
Runner de commandes scripté pour tester sans runtime conteneurs

Remplace `SystemRunner`: aucune commande n'est lancée. Chaque invocation est
enregistrée, et la réponse vient de la première règle dont le préfixe d'argv
correspond.
*/

use futures::future::BoxFuture;
use hostdeck_agent::{CommandOutput, CommandRunner, ExecError, Invocation};
use std::sync::{Arc, Mutex};

/// Réponse simulée d'une commande
#[derive(Debug, Clone)]
pub enum Reply {
    Success { stdout: String, stderr: String },
    Failure { code: i32, stderr: String },
    Timeout,
}

impl Reply {
    pub fn stdout(stdout: impl Into<String>) -> Self {
        Self::Success {
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failure(code: i32, stderr: impl Into<String>) -> Self {
        Self::Failure {
            code,
            stderr: stderr.into(),
        }
    }
}

#[derive(Debug, Clone)]
struct Rule {
    prefix: Vec<String>,
    reply: Reply,
}

/// Runner qui enregistre les invocations et rejoue des réponses
#[derive(Clone, Default)]
pub struct ScriptedRunner {
    rules: Arc<Mutex<Vec<Rule>>>,
    calls: Arc<Mutex<Vec<Invocation>>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ajoute une règle: si l'argv commence par `prefix`, répondre `reply`
    pub fn on<I, S>(self, prefix: I, reply: Reply) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rules.lock().unwrap().push(Rule {
            prefix: prefix.into_iter().map(Into::into).collect(),
            reply,
        });
        self
    }

    /// Toutes les invocations reçues (pour assertions de tests)
    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }

    /// Les argv reçus, joints par des espaces
    pub fn command_lines(&self) -> Vec<String> {
        self.calls().iter().map(|c| c.args.join(" ")).collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn reply_for(&self, invocation: &Invocation) -> Option<Reply> {
        self.rules
            .lock()
            .unwrap()
            .iter()
            .find(|rule| invocation.args.starts_with(&rule.prefix))
            .map(|rule| rule.reply.clone())
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, invocation: Invocation) -> BoxFuture<'_, Result<CommandOutput, ExecError>> {
        log::info!("📤 [MOCK] {}", invocation);
        self.calls.lock().unwrap().push(invocation.clone());

        let result = match self.reply_for(&invocation) {
            Some(Reply::Success { stdout, stderr }) => Ok(CommandOutput {
                stdout,
                stderr,
                execution_time_ms: 0,
            }),
            Some(Reply::Failure { code, stderr }) => Err(ExecError::Failed {
                program: invocation.program,
                code: Some(code),
                stderr,
            }),
            Some(Reply::Timeout) => Err(ExecError::Timeout {
                program: invocation.program,
                timeout: invocation.timeout,
            }),
            None => {
                log::warn!("⚠️ [MOCK] no scripted reply for {}", invocation.args.join(" "));
                Err(ExecError::Failed {
                    program: invocation.program,
                    code: Some(127),
                    stderr: "no scripted reply".to_string(),
                })
            }
        };

        Box::pin(async move { result })
    }
}
