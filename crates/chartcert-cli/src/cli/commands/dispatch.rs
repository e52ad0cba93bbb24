use super::super::args::*;

pub async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    match cli.cmd {
        Command::Certify(args) => super::certify::run(args).await,
        Command::Checks(args) => Ok(super::checks::run(args)),
    }
}
