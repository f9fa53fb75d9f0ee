use anyhow::Result;
use clap::{Arg, ArgAction, ArgMatches, Command, ValueHint};
use log::LevelFilter;
use std::path::PathBuf;

use bayesem_cli::commands::config::TrainConfig;
use bayesem_cli::commands::evaluate::{run_cross_validation, run_evaluate};
use bayesem_cli::commands::predict::run_predict;
use bayesem_cli::commands::train::run_train;

const HELP_TEMPLATE: &str = "{usage-heading} {usage}\n\n\
{about-with-newline}\n\
Written by {author-with-newline}Version {version}\n\n\
{all-args}{after-help}";

fn main() {
    env_logger::Builder::default()
        .filter_level(LevelFilter::Error)
        .parse_env(env_logger::Env::default().filter_or("BAYESEM_LOG", "error,bayesem=info"))
        .init();

    let matches = Command::new("bayesem")
        .version(clap::crate_version!())
        .author("bayesem developers")
        .about("\n bayesem: steerable semi-supervised Naive Bayes text classification")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .help_template(HELP_TEMPLATE)
        .subcommand(train_command())
        .subcommand(predict_command())
        .subcommand(evaluate_command())
        .get_matches();

    let result = match matches.subcommand() {
        Some(("train", train_matches)) => handle_train(train_matches),
        Some(("predict", predict_matches)) => handle_predict(predict_matches),
        Some(("evaluate", evaluate_matches)) => handle_evaluate(evaluate_matches),
        _ => unreachable!("Unknown subcommand"),
    };

    if let Err(e) = result {
        log::error!("bayesem failed: {:#}", e);
        std::process::exit(1);
    }
}

fn config_arg() -> Arg {
    Arg::new("config")
        .help("Path to training configuration file (JSON)")
        .required(false)
        .value_parser(clap::value_parser!(PathBuf))
        .value_hint(ValueHint::FilePath)
}

fn train_data_arg() -> Arg {
    Arg::new("train_data")
        .short('d')
        .long("train_data")
        .help("Document TSV with `features` and optional `label` and `id` columns. Overrides the config file.")
        .value_hint(ValueHint::FilePath)
}

fn learner_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("kind")
                .short('k')
                .long("kind")
                .help("Likelihood strategy. Overrides the config file.")
                .value_parser(["standard", "feature-marginals", "sfe"]),
        )
        .arg(
            Arg::new("em_iterations")
                .short('e')
                .long("em_iterations")
                .help("Number of EM rounds over the unlabelled rows. Overrides the config file.")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("one_vs_rest")
                .long("one_vs_rest")
                .help("Train one binary learner per label")
                .action(ArgAction::SetTrue),
        )
}

fn train_command() -> Command {
    let command = Command::new("train")
        .about("Train a classifier and save it as a JSON model file")
        .arg(config_arg())
        .arg(train_data_arg())
        .arg(
            Arg::new("model_path")
                .short('o')
                .long("model_path")
                .help("File to write the trained model to. Overrides the config file.")
                .value_hint(ValueHint::FilePath),
        )
        .help_template(HELP_TEMPLATE);
    learner_args(command)
}

fn predict_command() -> Command {
    Command::new("predict")
        .about("Predict label distributions with a saved model")
        .arg(
            Arg::new("model")
                .short('m')
                .long("model")
                .help("Saved model file")
                .required(true)
                .value_parser(clap::value_parser!(PathBuf))
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("data")
                .short('d')
                .long("data")
                .help("Document TSV to classify")
                .required(true)
                .value_parser(clap::value_parser!(PathBuf))
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .help("Prediction TSV to write")
                .default_value("predictions.tsv")
                .value_parser(clap::value_parser!(PathBuf))
                .value_hint(ValueHint::FilePath),
        )
        .help_template(HELP_TEMPLATE)
}

fn evaluate_command() -> Command {
    let command = Command::new("evaluate")
        .about("Score a saved model on labelled data, or cross-validate a training configuration")
        .arg(config_arg())
        .arg(train_data_arg())
        .arg(
            Arg::new("model")
                .short('m')
                .long("model")
                .help("Saved model file to score against --data")
                .value_parser(clap::value_parser!(PathBuf))
                .value_hint(ValueHint::FilePath)
                .requires("data"),
        )
        .arg(
            Arg::new("data")
                .long("data")
                .help("Labelled document TSV to score the saved model on")
                .value_parser(clap::value_parser!(PathBuf))
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("folds")
                .long("folds")
                .help("Number of cross-validation folds")
                .default_value("5")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .help("Seed for the cross-validation shuffle")
                .default_value("42")
                .value_parser(clap::value_parser!(u64)),
        )
        .help_template(HELP_TEMPLATE);
    learner_args(command)
}

fn handle_train(matches: &ArgMatches) -> Result<()> {
    let config_path = matches.get_one::<PathBuf>("config");
    if config_path.is_none() && matches.get_one::<String>("train_data").is_none() {
        println!("No training config or data provided. Example config:\n");
        println!("{}", serde_json::to_string_pretty(&TrainConfig::default())?);
        return Ok(());
    }

    let config = TrainConfig::from_arguments(config_path.map(PathBuf::as_path), matches)?;
    log::debug!("Training config: {:?}", config);
    run_train(&config)?;
    Ok(())
}

fn handle_predict(matches: &ArgMatches) -> Result<()> {
    let (Some(model), Some(data), Some(output)) = (
        matches.get_one::<PathBuf>("model"),
        matches.get_one::<PathBuf>("data"),
        matches.get_one::<PathBuf>("output"),
    ) else {
        anyhow::bail!("predict requires --model, --data and --output");
    };
    let rows = run_predict(model, data, output)?;
    log::info!("Predicted {} documents", rows);
    Ok(())
}

fn handle_evaluate(matches: &ArgMatches) -> Result<()> {
    if let Some(model) = matches.get_one::<PathBuf>("model") {
        let Some(data) = matches.get_one::<PathBuf>("data") else {
            anyhow::bail!("--model requires --data");
        };
        let report = run_evaluate(model, data)?;
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let config_path = matches.get_one::<PathBuf>("config");
    let config = TrainConfig::from_arguments(config_path.map(PathBuf::as_path), matches)?;
    let folds = matches.get_one::<usize>("folds").copied().unwrap_or(5);
    let seed = matches.get_one::<u64>("seed").copied().unwrap_or(42);
    let reports = run_cross_validation(&config, folds, seed)?;
    println!("{}", serde_json::to_string_pretty(&reports)?);
    Ok(())
}
