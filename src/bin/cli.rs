#![cfg(feature = "cli")]

use ansi_term::Colour;
use art_store::{ArtTable, IPv4, Insert, NoMeta, PcArtTable, RouteRecord};

use inetnum::addr::Prefix;

use std::env;
use std::error::Error;
use std::fs;
use std::net::Ipv4Addr;
use std::str::FromStr;

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

const STRIDES: [u8; 8] = [4; 8];

// One table of either variant behind a single command surface.
enum Table {
    Simple(ArtTable<IPv4, NoMeta>),
    Pc(PcArtTable<IPv4, NoMeta>),
}

impl Table {
    fn insert(&mut self, pfx: &Prefix) -> Result<Insert<NoMeta>, Box<dyn Error>> {
        Ok(match self {
            Table::Simple(t) => t.insert(pfx, NoMeta::Empty)?,
            Table::Pc(t) => t.insert(pfx, NoMeta::Empty)?,
        })
    }

    fn remove(&mut self, pfx: &Prefix) -> bool {
        match self {
            Table::Simple(t) => t.remove(pfx).is_some(),
            Table::Pc(t) => t.remove(pfx).is_some(),
        }
    }

    fn match_longest(&self, addr: Ipv4Addr) -> Option<String> {
        match self {
            Table::Simple(t) => {
                t.match_longest(addr).map(|e| e.prefix().to_string())
            }
            Table::Pc(t) => {
                t.match_longest(addr).map(|e| e.prefix().to_string())
            }
        }
    }

    fn match_exact(&self, pfx: &Prefix) -> Option<String> {
        match self {
            Table::Simple(t) => {
                t.match_exact(pfx).map(|e| e.prefix().to_string())
            }
            Table::Pc(t) => t.match_exact(pfx).map(|e| e.prefix().to_string()),
        }
    }

    fn dump(&self) -> Vec<RouteRecord> {
        let mut records = vec![];
        match self {
            Table::Simple(t) => {
                t.walk_breadth_first(|e| records.push(e.into()))
            }
            Table::Pc(t) => t.walk_breadth_first(|e| records.push(e.into())),
        }
        records
    }

    fn route_count(&self) -> usize {
        match self {
            Table::Simple(t) => t.route_count(),
            Table::Pc(t) => t.route_count(),
        }
    }

    fn consistency_check(&self) -> bool {
        match self {
            Table::Simple(t) => t.consistency_check(),
            Table::Pc(t) => t.consistency_check(),
        }
    }

    fn stats(&self) -> String {
        match self {
            Table::Simple(t) => t.stats().to_string(),
            Table::Pc(t) => t.stats().to_string(),
        }
    }
}

// One prefix in `address/length` form per line; lines without a slash are
// ignored, as are blank lines and trailing whitespace.
fn read_prefixes(path: &str) -> Result<Vec<Prefix>, Box<dyn Error>> {
    let mut pfxs = vec![];
    for line in fs::read_to_string(path)?.lines() {
        let line = line.trim();
        if !line.contains('/') {
            continue;
        }
        match Prefix::from_str(line) {
            Ok(pfx) => pfxs.push(pfx),
            Err(err) => {
                println!(
                    "{}",
                    Colour::Yellow
                        .paint(format!("skipping {:?}: {}", line, err))
                );
            }
        }
    }
    Ok(pfxs)
}

fn load(table: &mut Table, path: &str) -> Result<(), Box<dyn Error>> {
    let pfxs = read_prefixes(path)?;
    let mut added = 0;
    let mut dups = 0;
    for pfx in &pfxs {
        match table.insert(pfx)? {
            Insert::Added => added += 1,
            Insert::Duplicate(_) => dups += 1,
        }
    }
    println!("loaded {} prefixes ({} duplicates)", added, dups);
    Ok(())
}

fn unload(table: &mut Table, path: &str) -> Result<(), Box<dyn Error>> {
    let pfxs = read_prefixes(path)?;
    let removed = pfxs.iter().filter(|pfx| table.remove(pfx)).count();
    println!("unloaded {} of {} prefixes", removed, pfxs.len());
    Ok(())
}

fn print_help() {
    println!("commands:");
    println!("  load FILE      insert every prefix in FILE");
    println!("  unload FILE    remove every prefix in FILE");
    println!("  add P          insert prefix P (a.b.c.d/len)");
    println!("  del P          remove prefix P");
    println!("  lpm A          longest-prefix match for address A");
    println!("  exact P        exact match for prefix P");
    println!("  dump           list all routes in breadth-first order");
    println!("  json           list all routes as JSON");
    println!("  validate       recompute and verify structural counters");
    println!("  stats          per-level subtable counters");
    println!("  quit");
}

fn parse_prefix(arg: &str) -> Option<Prefix> {
    match Prefix::from_str(arg) {
        Ok(pfx) => Some(pfx),
        Err(err) => {
            println!(
                "{}",
                Colour::Red.paint(format!("can't parse {:?}: {}", arg, err))
            );
            None
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let args: Vec<String> = env::args().collect();
    let mut table = match args.get(1).map(|s| s.as_str()) {
        Some("simple") => Table::Simple(ArtTable::new(&STRIDES)?),
        Some("pc") | None => Table::Pc(PcArtTable::new(&STRIDES)?),
        Some(other) => {
            println!("usage: cli [simple|pc] [FILE]");
            return Err(format!("unknown table variant {:?}", other).into());
        }
    };
    if let Some(path) = args.get(2) {
        load(&mut table, path)?;
    }

    let mut rl = DefaultEditor::new()?;
    let _ = rl.load_history("/tmp/art-store-history.txt");
    loop {
        let readline = rl.readline("(art-store)> ");
        match readline {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line);
                let (cmd, arg) = match line.split_once(' ') {
                    Some((cmd, arg)) => (cmd, arg.trim()),
                    None => (line, ""),
                };
                match cmd {
                    "load" => {
                        if let Err(err) = load(&mut table, arg) {
                            println!(
                                "{}",
                                Colour::Red.paint(format!("{}", err))
                            );
                        }
                    }
                    "unload" => {
                        if let Err(err) = unload(&mut table, arg) {
                            println!(
                                "{}",
                                Colour::Red.paint(format!("{}", err))
                            );
                        }
                    }
                    "add" => {
                        if let Some(pfx) = parse_prefix(arg) {
                            match table.insert(&pfx)? {
                                Insert::Added => println!("added {}", pfx),
                                Insert::Duplicate(_) => {
                                    println!("{} is already present", pfx)
                                }
                            }
                        }
                    }
                    "del" => {
                        if let Some(pfx) = parse_prefix(arg) {
                            if table.remove(&pfx) {
                                println!("removed {}", pfx);
                            } else {
                                println!("{} is not in the table", pfx);
                            }
                        }
                    }
                    "lpm" => match arg.parse::<Ipv4Addr>() {
                        Ok(addr) => match table.match_longest(addr) {
                            Some(pfx) => println!("{}", pfx),
                            None => println!("no match"),
                        },
                        Err(err) => println!(
                            "{}",
                            Colour::Red.paint(format!(
                                "can't parse address {:?}: {}",
                                arg, err
                            ))
                        ),
                    },
                    "exact" => {
                        if let Some(pfx) = parse_prefix(arg) {
                            match table.match_exact(&pfx) {
                                Some(found) => println!("{}", found),
                                None => println!("no match"),
                            }
                        }
                    }
                    "dump" => {
                        for record in table.dump() {
                            println!("{}", record.prefix);
                        }
                        println!("total routes: {}", table.route_count());
                    }
                    "json" => {
                        println!(
                            "{}",
                            serde_json::to_string_pretty(&table.dump())?
                        );
                    }
                    "validate" => {
                        if table.consistency_check() {
                            println!(
                                "{}",
                                Colour::Green.paint("counters consistent")
                            );
                        } else {
                            println!(
                                "{}",
                                Colour::Red.paint("counters INCONSISTENT")
                            );
                        }
                    }
                    "stats" => print!("{}", table.stats()),
                    "help" => print_help(),
                    "quit" | "exit" => break,
                    _ => {
                        println!("unknown command {:?}", cmd);
                        print_help();
                    }
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                break;
            }
            Err(err) => {
                println!("Error: {:?}", err);
                break;
            }
        }
    }
    let _ = rl.save_history("/tmp/art-store-history.txt");
    Ok(())
}
