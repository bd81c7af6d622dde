//! Step navigation

use anyhow::Result;
use contentflow_utils::types::StepId;

use super::common::CommandEnv;

pub fn execute_back_command(env: &CommandEnv) -> Result<()> {
    let mut ctx = env.load_context()?;
    let step = ctx.go_back()?;
    env.save_context(&ctx)?;
    println!("Now at step {step}");
    Ok(())
}

pub fn execute_goto_command(env: &CommandEnv, step: StepId) -> Result<()> {
    let mut ctx = env.load_context()?;
    ctx.go_to(step)?;
    env.save_context(&ctx)?;
    println!("Now at step {step}");
    Ok(())
}

/// Start over with a new workflow id; the session id is kept.
pub fn execute_reset_command(env: &CommandEnv) -> Result<()> {
    let mut ctx = env.load_context()?;
    ctx.reset();
    env.save_context(&ctx)?;
    println!("Started workflow {}", ctx.workflow_id());
    Ok(())
}
