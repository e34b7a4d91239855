use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info, Level};
use simple_logger::init_with_level;

use novexon::aggregate::{aggregate_right_elements, event_stats, merge_samples};
use novexon::annotation::AnnotationIndex;
use novexon::conservation::attach_conservation;
use novexon::ecdf::score_events;
use novexon::events::detect_events;
use novexon::exon_graph::build_exon_graph;
use novexon::filter::filter_novel_events;
use novexon::frame::{
    read_csv, read_gtf, read_headerless, read_table, write_headerless, write_lines, write_table,
};
use novexon::junctions::{merge_junction_support, JunctionTable};
use novexon::novexon_structs::{ConservationRecord, GeneModelRecord};
use novexon::report::{bed12_line, novel_regions, summarize_novel_exons, track_header};
use novexon::tables;

mod cli;
use cli::{AggregateArgs, Cli, Commands, DetectArgs, FilterArgs, RegionsArgs, ReportArgs, ScoreArgs};

fn main() {
    let start = Instant::now();
    let cli = Cli::parse();

    let level = if cli.verbose { Level::Debug } else { Level::Info };
    if let Err(e) = init_with_level(level) {
        eprintln!("ERROR: could not initialise logging: {}", e);
        std::process::exit(1);
    }

    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .unwrap_or_else(|e| {
                error!("{}", e);
                std::process::exit(1);
            });
    }

    run(cli.command).unwrap_or_else(|e| {
        error!("{:#}", e);
        std::process::exit(1);
    });

    let elapsed = start.elapsed();
    info!("Elapsed time: {:?}", elapsed);
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Detect(args) => detect(args),
        Commands::Aggregate(args) => aggregate(args),
        Commands::Regions(args) => regions(args),
        Commands::Score(args) => score(args),
        Commands::Stats(args) => stats(args),
        Commands::Filter(args) => filter(args),
        Commands::Report(args) => report(args),
    }
}

/// GTF when the path says so, a flattened gene model table otherwise.
fn read_gene_model(path: &Path) -> Result<Vec<GeneModelRecord>> {
    let records = if path.extension().is_some_and(|ext| ext == "gtf") {
        read_gtf(path)?
    } else {
        tables::gene_model_from_frame(&read_table(path)?)?
    };
    Ok(records)
}

fn detect(args: DetectArgs) -> Result<()> {
    let index = AnnotationIndex::from_gene_model(
        read_gene_model(&args.annotation)
            .with_context(|| format!("reading annotation {}", args.annotation.display()))?,
    );
    let assembly = read_gtf(&args.assembly)
        .with_context(|| format!("reading assembly {}", args.assembly.display()))?;
    let junction_frame = read_headerless(&args.junctions, "junctions", &tables::JUNCTION_COLUMNS)?;
    let junctions = JunctionTable::from_junctions(tables::junctions_from_frame(&junction_frame)?);

    let exons = build_exon_graph(assembly, &index);
    let supported = merge_junction_support(exons, &junctions);
    let events = detect_events(&supported, &index, &args.sample_name);

    write_table(&args.output, &mut tables::events_to_frame(&events)?)?;
    Ok(())
}

fn aggregate(args: AggregateArgs) -> Result<()> {
    let samples = args
        .inputs
        .iter()
        .map(|path| {
            let df = read_table(path).with_context(|| format!("reading events {}", path.display()))?;
            Ok(tables::events_from_frame(&df)?)
        })
        .collect::<Result<Vec<_>>>()?;

    let aggregated = aggregate_right_elements(merge_samples(samples));
    write_table(&args.output, &mut tables::aggregated_to_frame(&aggregated)?)?;
    Ok(())
}

fn regions(args: RegionsArgs) -> Result<()> {
    let aggregated = tables::aggregated_from_frame(&read_table(&args.input)?)?;
    let regions = novel_regions(&aggregated, args.radius);
    info!("Writing {} novel regions", regions.len());
    write_headerless(&args.output, &mut tables::regions_to_frame(&regions)?)?;
    Ok(())
}

fn read_conservation(path: &Path) -> Result<Vec<ConservationRecord>> {
    let df = read_headerless(path, "conservation", &tables::CONSERVATION_COLUMNS)
        .with_context(|| format!("reading conservation {}", path.display()))?;
    Ok(tables::conservation_from_frame(&df)?)
}

fn score(args: ScoreArgs) -> Result<()> {
    let config = args.config();
    let aggregated = tables::aggregated_from_frame(&read_table(&args.input)?)?;
    let annotated = attach_conservation(aggregated, read_conservation(&args.conservation)?, &config);
    let scored = score_events(annotated, &config)?;
    write_table(&args.output, &mut tables::scored_to_frame(&scored)?)?;
    Ok(())
}

fn stats(args: ScoreArgs) -> Result<()> {
    let config = args.config();
    let aggregated = tables::aggregated_from_frame(&read_table(&args.input)?)?;
    let annotated = attach_conservation(aggregated, read_conservation(&args.conservation)?, &config);
    let stats = event_stats(&annotated, config.partition);
    write_table(&args.output, &mut tables::stats_to_frame(&stats)?)?;
    Ok(())
}

fn filter(args: FilterArgs) -> Result<()> {
    let scored = tables::scored_from_frame(&read_table(&args.input)?)?;
    let index = AnnotationIndex::from_gene_model(read_gene_model(&args.annotation)?);
    let meta = tables::sample_meta_from_frame(&read_csv(&args.meta)?)?;
    let novel = filter_novel_events(scored, &index, meta, &args.thresholds());
    write_table(&args.output, &mut tables::novel_to_frame(&novel)?)?;
    Ok(())
}

fn report(args: ReportArgs) -> Result<()> {
    let config = args.config();
    let novel = tables::novel_from_frame(&read_table(&args.input)?)?;
    let summary = summarize_novel_exons(novel, &config);
    info!("Reporting {} novel exons", summary.len());

    write_table(&args.output_tsv, &mut tables::summary_to_frame(&summary)?)?;
    let lines = std::iter::once(track_header(&config.track_name)).chain(summary.iter().map(bed12_line));
    write_lines(&args.output_bed, lines)?;
    Ok(())
}
