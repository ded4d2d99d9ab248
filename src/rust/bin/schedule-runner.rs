// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

#![deny(clippy::all)]

//======================================================================================================================
// Imports
//======================================================================================================================

use ::anyhow::Result;
use ::bgsched::{
    config::{
        ItemDescriptor,
        ScheduleDescriptor,
        WorkDescriptor,
    },
    runtime::logging,
    work::TimedWorkItem,
    Config,
    ScheduleManager,
    SharedSchedule,
    SharedScheduleItem,
    SharedWorkItem,
    TickLoop,
};
use ::clap::{
    Arg,
    ArgMatches,
    Command,
};
use ::rand::{
    rngs::SmallRng,
    Rng,
    SeedableRng,
};
use ::std::time::Instant;

//======================================================================================================================
// Structures
//======================================================================================================================

#[derive(Debug)]
pub struct ProgramArguments {
    config_path: String,
    max_ticks: Option<u64>,
}

impl ProgramArguments {
    pub fn new() -> Result<Self> {
        let matches: ArgMatches = Command::new("schedule-runner")
            .about("Runs the schedules described in a configuration file")
            .arg(
                Arg::new("config")
                    .long("config")
                    .value_parser(clap::value_parser!(String))
                    .required(true)
                    .value_name("FILE")
                    .help("Sets the configuration file"),
            )
            .arg(
                Arg::new("max-ticks")
                    .long("max-ticks")
                    .value_parser(clap::value_parser!(u64))
                    .required(false)
                    .value_name("N")
                    .help("Overrides the tick limit of the configuration file"),
            )
            .get_matches();

        let config_path: String = match matches.get_one::<String>("config") {
            Some(path) => path.clone(),
            None => anyhow::bail!("missing configuration file"),
        };

        Ok(Self {
            config_path,
            max_ticks: matches.get_one::<u64>("max-ticks").copied(),
        })
    }
}

struct Application {
    manager: ScheduleManager,
    schedules: Vec<SharedSchedule>,
    tick_loop: TickLoop,
}

impl Application {
    pub fn new(args: &ProgramArguments) -> Result<Self> {
        let config: Config = Config::new(&args.config_path)?;
        let max_ticks: u64 = match args.max_ticks {
            Some(max_ticks) => max_ticks,
            None => config.max_ticks()?,
        };
        let mut rng: SmallRng = match config.seed()? {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };

        let mut manager: ScheduleManager = ScheduleManager::with_shutdown_ticks(config.shutdown_ticks()?);
        let mut schedules: Vec<SharedSchedule> = Vec::new();
        for descriptor in config.schedules()? {
            let schedule: SharedSchedule = Self::build_schedule(&manager, &descriptor, &mut rng)?;
            manager.submit_schedule(schedule.clone())?;
            schedules.push(schedule);
        }

        Ok(Self {
            manager,
            schedules,
            tick_loop: TickLoop::new(config.tick_interval()?).with_max_ticks(max_ticks),
        })
    }

    pub fn run(&mut self) -> Result<()> {
        let start_time: Instant = Instant::now();
        let ticks: u64 = self
            .tick_loop
            .run(&mut self.manager, |manager: &ScheduleManager| manager.num_schedules() == 0);

        println!("{:?} ticks in {:?} us", ticks, start_time.elapsed().as_micros());
        for schedule in self.schedules.iter() {
            println!(
                "{}: state={:?}, progress={:.2}, items={}/{}, canceled={}",
                schedule.description(),
                schedule.state(),
                schedule.progress(),
                schedule.current_item_index(),
                schedule.num_items(),
                schedule.is_canceled()
            );
        }
        Ok(())
    }

    fn build_schedule(
        manager: &ScheduleManager,
        descriptor: &ScheduleDescriptor,
        rng: &mut SmallRng,
    ) -> Result<SharedSchedule> {
        let schedule: SharedSchedule = manager.create_schedule(&descriptor.name);
        for item_descriptor in descriptor.items.iter() {
            schedule.add_item(Self::build_item(manager, item_descriptor, rng)?)?;
        }
        Ok(schedule)
    }

    fn build_item(
        manager: &ScheduleManager,
        descriptor: &ItemDescriptor,
        rng: &mut SmallRng,
    ) -> Result<SharedScheduleItem> {
        let item: SharedScheduleItem = manager.create_schedule_item(&descriptor.name);
        for work_descriptor in descriptor.work.iter() {
            item.add_work_item(Self::build_work(work_descriptor, rng))?;
        }
        Ok(item)
    }

    fn build_work(descriptor: &WorkDescriptor, rng: &mut SmallRng) -> SharedWorkItem {
        let ticks: usize = descriptor.ticks + rng.gen_range(0..=descriptor.jitter);
        SharedWorkItem::new(
            TimedWorkItem::new(&descriptor.name, ticks)
                .with_fail_on_start(descriptor.fail_on_start)
                .with_fail_on_tick(descriptor.fail_on_tick)
                .with_stop_ticks(descriptor.stop_ticks),
        )
    }
}

//======================================================================================================================
// main
//======================================================================================================================

fn main() -> Result<()> {
    logging::initialize();
    let args: ProgramArguments = ProgramArguments::new()?;
    let mut app: Application = Application::new(&args)?;
    app.run()
}
