//! EVE industry production calculator
//!
//! Expands a production target into per-level manufacturing steps and a
//! raw-material shopping list, honoring blueprint research and facility
//! bonuses.

mod balance;
mod calculator;
mod catalog;
mod db;
mod error;
mod models;
mod setup;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use rusqlite::Connection;

use crate::calculator::{Decomposition, Decompositor};
use crate::catalog::Catalog;
use crate::db::SqliteCatalog;
use crate::setup::{
    Blueprint, CitadelType, MediumSetIndustryRig, RigKind, RigTier, Setup, SpaceType,
};

#[derive(Parser)]
#[command(name = "eve-industry-calculator")]
#[command(about = "Multi-level production calculator for EVE Online industry")]
struct Cli {
    /// Path to the SQLite reference database
    #[arg(short, long, default_value = "eve_sde.db")]
    database: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Expand an item into production steps and raw materials
    Decompose {
        /// Item to produce (e.g. "Tengu")
        item: String,

        /// Quantity to produce
        #[arg(short, long, default_value = "1")]
        quantity: f64,

        /// Citadel the jobs run in
        #[arg(long, default_value = "raitaru")]
        citadel: CitadelType,

        /// Security band of the citadel's system
        #[arg(long, default_value = "null-wh")]
        space: SpaceType,

        /// Fitted rig as class:tier:kind (e.g. advanced-component:t1:me); repeatable
        #[arg(long = "rig", value_parser = parse_rig)]
        rigs: Vec<MediumSetIndustryRig>,

        /// Researched material efficiency of the target blueprint
        #[arg(long)]
        me: Option<f64>,

        /// Researched time efficiency of the target blueprint
        #[arg(long)]
        te: Option<f64>,

        /// Licensed runs left on the target blueprint
        #[arg(long)]
        runs: Option<u64>,

        /// Available manufacturing lines
        #[arg(long, default_value = "20")]
        production_lines: u32,

        /// Available reaction lines
        #[arg(long, default_value = "20")]
        reaction_lines: u32,

        /// Show the efficiency table and per-level steps
        #[arg(short, long)]
        verbose: bool,

        /// Show run distribution across production lines
        #[arg(long)]
        balance: bool,
    },

    /// List all producible items
    ListProducts,

    /// Show recipe details for an item
    Item {
        /// Item name
        name: String,
    },

    /// Initialize empty database with schema
    Init,

    /// Load a small fixture chain for testing without a full data export
    LoadSample,
}

/// Parse a rig spec of the form "class:tier:kind".
fn parse_rig(s: &str) -> Result<MediumSetIndustryRig, String> {
    let mut parts = s.split(':');
    let (Some(class), Some(tier), Some(kind), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(format!("expected class:tier:kind, got '{s}'"));
    };
    let production_class = class.parse()?;
    let tier = match tier {
        "t1" => RigTier::T1,
        "t2" => RigTier::T2,
        other => return Err(format!("unknown rig tier '{other}', expected t1 or t2")),
    };
    let kind = match kind {
        "me" => RigKind::Material,
        "te" => RigKind::Time,
        other => return Err(format!("unknown rig kind '{other}', expected me or te")),
    };
    Ok(MediumSetIndustryRig {
        production_class,
        tier,
        kind,
    })
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let conn = Connection::open(&cli.database)?;
    db::init_schema(&conn)?;

    match cli.command {
        Commands::Decompose {
            item,
            quantity,
            citadel,
            space,
            rigs,
            me,
            te,
            runs,
            production_lines,
            reaction_lines,
            verbose,
            balance,
        } => {
            let mut setup = Setup::default();
            setup.citadel_type = citadel;
            setup.space_type = space;
            setup.set_lines(reaction_lines, production_lines);
            for rig in rigs {
                setup.rig_set.add(rig);
            }

            let catalog = SqliteCatalog::open(&conn, &setup.non_productables)?;

            if me.is_some() || te.is_some() || runs.is_some() {
                let mut blueprint =
                    Blueprint::new(item.clone(), me.unwrap_or(0.0), te.unwrap_or(0.0));
                if let Some(runs) = runs {
                    blueprint = blueprint.with_runs(runs);
                }
                setup.add_blueprint(&catalog, blueprint)?;
            }

            let efficiency = setup.efficiency_table(&catalog)?;
            let decompositor = Decompositor::new(&catalog, &efficiency);
            let initial = decompositor.initial_table(&item, quantity)?;
            let decomposition = Decomposition::build(initial, &decompositor)?;

            if verbose {
                if !efficiency.is_empty() {
                    println!("Efficiency:");
                    for (item_id, entry) in &efficiency {
                        println!(
                            "  {}: {:.1}% materials, {:.1}% time, {} runs max",
                            catalog.item_name(*item_id)?,
                            entry.me_impact * 100.0,
                            entry.te_impact * 100.0,
                            entry.run
                        );
                    }
                    println!();
                }
                println!("{decomposition}");
            } else {
                println!("Required materials:");
                for (name, quantity) in decomposition.required_materials() {
                    println!("{name}\t{quantity}");
                }
            }

            if balance {
                println!();
                print!("{}", balance::balance_report(&decomposition, &setup));
            }
        }

        Commands::ListProducts => {
            let products = db::list_products(&conn)?;
            if products.is_empty() {
                println!("No products in database. Run 'load-sample' first.");
            } else {
                println!("Producible items:");
                for name in products {
                    println!("  {name}");
                }
            }
        }

        Commands::Item { name } => {
            let setup = Setup::default();
            let catalog = SqliteCatalog::open(&conn, &setup.non_productables)?;
            match catalog.lookup_item(&name)? {
                None => println!("Item '{name}' not found"),
                Some(item) => {
                    println!("Item: {}", item.name);
                    println!("  ID: {}", item.id);
                    if let Some(group) = item.market_group_id {
                        println!("  Market group: {group}");
                    }
                    match catalog.lookup_recipe(item.id)? {
                        None => println!("  No recipe - raw material"),
                        Some(recipe) => {
                            println!(
                                "  Produced by {} in batches of {}",
                                recipe.activity, recipe.output_quantity
                            );
                            println!("  Inputs per run:");
                            for input in &recipe.inputs {
                                println!(
                                    "    {} x {}",
                                    catalog.item_name(input.item)?,
                                    input.quantity
                                );
                            }
                            if !catalog.is_producible(item.id)? {
                                println!("  Marked non-productable - treated as raw");
                            }
                        }
                    }
                }
            }
        }

        Commands::Init => {
            println!("Database initialized at: {}", cli.database.display());
        }

        Commands::LoadSample => {
            db::load_sample(&conn)?;
            println!("Sample data loaded successfully!");
        }
    }

    Ok(())
}
