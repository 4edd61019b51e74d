//! External simulator invoked as a subprocess.
//!
//! The command receives the Safe, target contract, function signature,
//! value and arguments, and prints a broadcast document on stdout:
//!
//! ```text
//! {"transactions": [{"type": "CALL", "to": "0x…", "value": "0", "data": "0x…"}]}
//! ```
//!
//! Anything before the first `{` is treated as log output.

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::domain::simulation::Broadcast;
use crate::domain::{SimulationOutput, SimulationRequest};
use crate::errors::SimulationError;
use crate::ports::Simulator;

pub struct CommandSimulator {
    program: String,
    fixed_args: Vec<String>,
}

impl CommandSimulator {
    /// `command[0]` is the program, the rest are passed before the request.
    pub fn new(command: &[String]) -> Self {
        let (program, fixed_args) = match command.split_first() {
            Some((program, rest)) => (program.clone(), rest.to_vec()),
            None => (String::new(), Vec::new()),
        };
        Self {
            program,
            fixed_args,
        }
    }

    pub(crate) fn arguments(&self, request: &SimulationRequest) -> Vec<String> {
        let mut args = self.fixed_args.clone();
        args.extend([
            "--safe".to_string(),
            format!("{:#x}", request.safe),
            "--to".to_string(),
            format!("{:#x}", request.call.contract),
            "--sig".to_string(),
            request.call.function.clone(),
            "--value".to_string(),
            request.call.value.to_string(),
        ]);
        if !request.call.args.is_empty() {
            args.push("--".to_string());
            args.extend(request.call.args.iter().cloned());
        }
        args
    }
}

pub(crate) fn parse_broadcast(stdout: &str) -> Result<Broadcast, SimulationError> {
    let start = stdout.find('{').ok_or(SimulationError::MissingOutput)?;
    serde_json::from_str(stdout[start..].trim_end())
        .map_err(|e| SimulationError::Malformed(e.to_string()))
}

#[async_trait]
impl Simulator for CommandSimulator {
    async fn simulate(&self, request: &SimulationRequest) -> Result<SimulationOutput, SimulationError> {
        let args = self.arguments(request);
        let command = std::iter::once(self.program.as_str())
            .chain(args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ");
        debug!(command = %command, "Running simulator");

        let output = Command::new(&self.program)
            .args(&args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| SimulationError::Launch {
                command: command.clone(),
                message: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(SimulationError::Failed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let broadcast = parse_broadcast(&stdout)?;
        if broadcast.transactions.is_empty() {
            return Err(SimulationError::MissingOutput);
        }
        Ok(SimulationOutput {
            command,
            output: stdout,
            calls: broadcast.transactions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{Address, FunctionCall, U256};

    fn request(args: Vec<&str>) -> SimulationRequest {
        SimulationRequest {
            safe: Address::from_low_u64_be(1),
            call: FunctionCall {
                contract: Address::from_low_u64_be(2),
                function: "transfer(address,uint256)".to_string(),
                args: args.into_iter().map(str::to_string).collect(),
                value: U256::zero(),
            },
        }
    }

    #[test]
    fn test_arguments_layout() {
        let simulator = CommandSimulator::new(&["forge".to_string(), "script".to_string()]);
        let args = simulator.arguments(&request(vec!["0x01", "5"]));
        assert_eq!(args[0], "script");
        assert_eq!(args[1], "--safe");
        assert_eq!(args[6], "transfer(address,uint256)");
        assert_eq!(&args[args.len() - 3..], &["--", "0x01", "5"]);

        let args = simulator.arguments(&request(Vec::new()));
        assert!(!args.contains(&"--".to_string()));
    }

    #[test]
    fn test_parse_broadcast_skips_log_prefix() {
        let stdout = "Compiling...\nDone\n{\"transactions\":[{\"type\":\"CALL\",\"to\":\"0x0000000000000000000000000000000000000002\"}]}\n";
        let broadcast = parse_broadcast(stdout).unwrap();
        assert_eq!(broadcast.transactions.len(), 1);
        assert!(matches!(
            parse_broadcast("no json here"),
            Err(SimulationError::MissingOutput)
        ));
        assert!(matches!(
            parse_broadcast("{\"transactions\": 3}"),
            Err(SimulationError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_program_is_launch_error() {
        let simulator = CommandSimulator::new(&["/nonexistent/safe-sync-simulator".to_string()]);
        let err = simulator.simulate(&request(Vec::new())).await.unwrap_err();
        assert!(matches!(err, SimulationError::Launch { .. }));
    }
}
