use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use tasktimer_core::schedule::parse_cutoff;
use tasktimer_core::{
    ChatCompletionsGenerator, Config, CoreError, GeneratorError, PlanRequest, ScheduleGenerator,
};

#[derive(Args)]
pub struct PlanArgs {
    /// To-do list (markdown or plain text)
    pub todo_file: PathBuf,

    /// Where to write the schedule
    #[arg(short, long, default_value = "schedule.json")]
    pub output: PathBuf,

    /// End of the workday (HH:MM); defaults to timer.workday_end_time
    #[arg(long, value_name = "HH:MM")]
    pub workday_end: Option<String>,
}

pub async fn run(args: PlanArgs) -> tasktimer_core::Result<()> {
    let todo_text = match std::fs::read_to_string(&args.todo_file) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(CoreError::NotFound {
                path: args.todo_file,
            });
        }
        Err(e) => return Err(e.into()),
    };

    let config = Config::load()?;
    let workday_end = match args.workday_end.as_deref() {
        Some(value) => Some(parse_cutoff(value)?),
        None => config.workday_end()?,
    };

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(120))
        .build()
        .map_err(GeneratorError::from)?;
    let generator = ChatCompletionsGenerator::from_env(
        client,
        &config.generator.base_url,
        config.generator.model.clone(),
        &config.generator.api_key_env,
    )?;

    println!("Generating timeline from '{}'...", args.todo_file.display());
    let request = PlanRequest::new(todo_text, chrono::Local::now().naive_local())
        .with_workday_end(workday_end);
    let schedule = generator.generate(&request).await?;

    let json = serde_json::to_string_pretty(&schedule)?;
    println!("--- Generated Schedule ---");
    println!("{json}");
    std::fs::write(&args.output, format!("{json}\n"))?;
    println!(
        "\n✅ Schedule successfully saved to '{}'",
        args.output.display()
    );
    Ok(())
}
