use clap::{Parser, ValueEnum};
use forest_carbon_core::{
    run_landscape, CarbonResult, Disturbance, DisturbanceSchedule, LandscapeComparison,
    ScenarioRun, SimulationConfig, StandRun, StandSimulator, UncertaintyEnsemble,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// What to run
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// One stand with a fire and an infestation at fixed years
    Stand,
    /// Monte Carlo landscape under both harvest policies
    Land,
    /// Repeated landscape comparisons with percentile bands
    Uncert,
}

/// Forest carbon simulation demo
#[derive(Parser, Debug)]
#[command(name = "carbon-demo")]
#[command(about = "Forest carbon under fire, beetle kill and salvage harvest", long_about = None)]
struct Args {
    /// TOML configuration file (reference setup if omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Analysis to run
    #[arg(short, long, value_enum, default_value_t = Mode::Land)]
    mode: Mode,

    /// Replicate stands per policy (overrides the configuration)
    #[arg(short, long)]
    replicates: Option<usize>,

    /// Simulated years (overrides the configuration)
    #[arg(short, long)]
    years: Option<usize>,

    /// Master random seed (overrides the configuration)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Landscape comparisons in the uncertainty ensemble
    #[arg(short, long, default_value_t = 10)]
    iterations: u32,

    /// Simulate replicates on one thread
    #[arg(long)]
    sequential: bool,

    /// Print a row every this many years
    #[arg(long, default_value_t = 10)]
    report_interval: usize,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> CarbonResult<()> {
    let mut config = match &args.config {
        Some(path) => SimulationConfig::load(path)?,
        None => SimulationConfig::default(),
    };
    if let Some(replicates) = args.replicates {
        config.scenario.replicates = replicates;
    }
    if let Some(years) = args.years {
        config.scenario.years = years;
    }
    if let Some(seed) = args.seed {
        config.scenario.seed = seed;
    }
    if args.sequential {
        config.scenario.parallel = false;
    }

    println!("=== Forest Carbon Demo ===\n");
    println!("Growth parameters:");
    print!("{}", config.parameter_set()?);
    println!();

    let (params, scenario) = config.validate()?;
    let every = args.report_interval.max(1);

    match args.mode {
        Mode::Stand => {
            let years = args.years.unwrap_or(120);
            let simulator = StandSimulator::new(&params)
                .with_turnover(scenario.turnover)
                .with_residual(scenario.residual);
            let run =
                simulator.run_scheduled(scenario.initial, years, &DisturbanceSchedule::reference_demo());
            print_stand(&run, every);
        }
        Mode::Land => {
            let landscape = run_landscape(&params, &scenario);
            print_scenario(&landscape.no_harvest, every);
            print_scenario(&landscape.harvest, every);
            print_comparison(&landscape.compare()?, every);
        }
        Mode::Uncert => {
            let ensemble = UncertaintyEnsemble::run(&params, &scenario, args.iterations)?;
            print_ensemble(&ensemble, every);
        }
    }

    info!("Done");
    Ok(())
}

fn print_stand(run: &StandRun, every: usize) {
    println!("Single stand, {} years (fire at year 40, beetle kill at year 80)\n", run.years());
    println!(
        "{:>5} {:>4} {:>8} {:>8} {:>8} {:>8} {:>8} {:>8} {:>8} {:>6}  event",
        "year", "age", "foliage", "stem", "root", "litter", "coarse", "soil", "total", "lai"
    );
    for (k, state) in run.trajectory.states().iter().enumerate() {
        let event = run.events[k];
        if k % every != 0 && event == Disturbance::None {
            continue;
        }
        let p = state.pools;
        let label = match event {
            Disturbance::None => "",
            Disturbance::Fire => "fire",
            Disturbance::UnharvestedInfestation => "beetle kill",
            Disturbance::HarvestedInfestation => "beetle kill + salvage",
        };
        println!(
            "{:>5} {:>4} {:>8.2} {:>8.2} {:>8.2} {:>8.2} {:>8.2} {:>8.2} {:>8.2} {:>6.2}  {}",
            k,
            state.age,
            p.foliage,
            p.stem,
            p.root,
            p.litter,
            p.coarse,
            p.soil,
            p.total(),
            state.lai,
            label
        );
    }
    println!();
}

fn print_scenario(run: &ScenarioRun, every: usize) {
    println!(
        "--- {} ({} replicates) ---",
        run.policy.label(),
        run.replicates
    );
    println!(
        "{:>6} {:>12} {:>12} {:>12} {:>12} {:>6} {:>6} {:>10}",
        "year", "live", "litter", "coarse", "soil", "fires", "infest", "harvested"
    );
    for k in (0..run.years.len()).step_by(every) {
        let p = run.pools.at(k);
        println!(
            "{:>6} {:>12.1} {:>12.1} {:>12.1} {:>12.1} {:>6} {:>6} {:>10.1}",
            run.years[k],
            p.live(),
            p.litter,
            p.coarse,
            p.soil,
            run.fires[k],
            run.infestations[k],
            run.harvested[k]
        );
    }
    println!(
        "Totals: {} fires, {} infestations, {:.1} MgC harvested\n",
        run.total_fires(),
        run.total_infestations(),
        run.total_harvested()
    );
}

fn print_comparison(comparison: &LandscapeComparison, every: usize) {
    println!("--- Harvest vs. no harvest ---");
    println!("{:>6} {:>14} {:>14}", "year", "deficit", "removed");
    for k in (0..comparison.len()).step_by(every) {
        println!(
            "{:>6} {:>14.2} {:>14.2}",
            comparison.years[k], comparison.deficit[k], comparison.cumulative_removed[k]
        );
    }
    if let Some(deficit) = comparison.final_deficit() {
        println!("\nFinal deficit:      {deficit:.2} MgC");
    }
    println!("Integrated deficit: {:.1} MgC·yr", comparison.integrated_deficit());
    println!("Total removed:      {:.2} MgC", comparison.total_removed());
}

fn print_ensemble(ensemble: &UncertaintyEnsemble, every: usize) {
    println!(
        "--- Carbon deficit over {} landscape comparisons ---",
        ensemble.iterations()
    );
    println!(
        "{:>6} {:>12} {:>12} {:>12} {:>12} {:>12}",
        "year", "p05", "median", "mean", "p95", "removed"
    );
    let d = &ensemble.deficit;
    for k in (0..ensemble.years.len()).step_by(every) {
        println!(
            "{:>6} {:>12.2} {:>12.2} {:>12.2} {:>12.2} {:>12.2}",
            ensemble.years[k],
            d.p05[k],
            d.median[k],
            d.mean[k],
            d.p95[k],
            ensemble.cumulative_removed.median[k]
        );
    }
}
