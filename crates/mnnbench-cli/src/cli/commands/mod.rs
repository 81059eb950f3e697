use super::args::*;

pub mod init;
pub mod plan;
pub mod run;
pub mod status;

pub mod exit_codes {
    pub const OK: i32 = 0;
    pub const RUN_FAILED: i32 = 1;
    pub const CONFIG_ERROR: i32 = 2;
}

pub async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    match cli.cmd {
        Command::Run(args) => run::cmd_run(args).await,
        Command::Plan(args) => plan::cmd_plan(args),
        Command::Init(args) => init::cmd_init(args),
        Command::Status(args) => status::cmd_status(args),
        Command::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(exit_codes::OK)
        }
    }
}
