//! `xhint` inspects and drives [EWMH](https://specifications.freedesktop.org/wm-spec/latest/) and
//! ICCCM compatible window managers from the command line. Everything it does goes through the
//! window manager's own client messages so the window manager stays in charge of the windows.
//!
//! ## Command line examples
//!
//! ### List the managed windows
//! ```bash
//! xhint window list
//! ```
//!
//! ### Move and resize the active window
//! Place the active window's frame at the top left corner with a size of 800x600.
//! ```bash
//! xhint window move 0 0 800 600
//! ```
//!
//! ### Switch desktops
//! ```bash
//! xhint desktop switch 2
//! ```
//!
//! ### Watch the window manager
//! Print active window and desktop changes as they happen.
//! ```bash
//! xhint watch
//! ```
use std::convert::TryFrom;

use clap::{crate_description, crate_version, Arg, ArgAction, ArgMatches, Command};
use gory::*;
use libxhint::prelude::*;
use tracing::Level;
use witcher::prelude::*;

fn cli() -> Command {
    let win = || {
        Arg::new("window")
            .short('w')
            .long("window")
            .value_name("WINDOW")
            .help("Window id, defaults to the active window")
    };
    Command::new("xhint")
        .about(crate_description!())
        .subcommand_required(true)
        .arg_required_else_help(true)
        .version(crate_version!())
        .arg(
            Arg::new("display")
                .short('d')
                .long("display")
                .value_name("DISPLAY")
                .global(true)
                .help("X display to connect to, defaults to $DISPLAY"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .action(ArgAction::Count)
                .global(true)
                .help("Log more, repeat for more detail"),
        )
        .subcommand(Command::new("info").visible_alias("i").about("Show window manager and active window information"))
        .subcommand(
            Command::new("window")
                .visible_alias("w")
                .about("Control individual windows")
                .subcommand_required(true)
                .arg_required_else_help(true)
                .subcommand(
                    Command::new("list")
                        .visible_alias("l")
                        .about("List out the managed windows")
                        .arg(
                            Arg::new("all")
                                .short('a')
                                .long("all")
                                .action(ArgAction::SetTrue)
                                .help("List all X11 windows"),
                        ),
                )
                .subcommand(
                    Command::new("close")
                        .visible_alias("c")
                        .about("Close a window")
                        .arg(win())
                        .arg(
                            Arg::new("delete")
                                .long("delete")
                                .action(ArgAction::SetTrue)
                                .help("Ask the client directly with WM_DELETE_WINDOW"),
                        ),
                )
                .subcommand(
                    Command::new("state")
                        .visible_alias("s")
                        .about("Show or change the states of a window")
                        .arg(win())
                        .arg(Arg::new("add").long("add").value_name("STATE").conflicts_with_all(["remove", "toggle"]))
                        .arg(Arg::new("remove").long("remove").value_name("STATE").conflicts_with("toggle"))
                        .arg(Arg::new("toggle").long("toggle").value_name("STATE")),
                )
                .subcommand(
                    Command::new("activate")
                        .visible_alias("a")
                        .about("Activate a window")
                        .arg(Arg::new("WINDOW").required(true)),
                )
                .subcommand(
                    Command::new("move")
                        .visible_alias("m")
                        .about("Move and resize a window including its frame")
                        .arg(win())
                        .arg(
                            Arg::new("frame")
                                .long("frame")
                                .value_name("STYLE")
                                .default_value("parent")
                                .help("Where the decorations live: none, parent or grandparent"),
                        )
                        .arg(Arg::new("X").required(true).allow_negative_numbers(true))
                        .arg(Arg::new("Y").required(true).allow_negative_numbers(true))
                        .arg(Arg::new("WIDTH"))
                        .arg(Arg::new("HEIGHT")),
                )
                .subcommand(
                    Command::new("desktop")
                        .visible_alias("d")
                        .about("Send a window to a desktop")
                        .arg(win())
                        .arg(Arg::new("DESKTOP").required(true)),
                ),
        )
        .subcommand(
            Command::new("desktop")
                .visible_alias("d")
                .about("Manage desktops (also known as workspaces)")
                .subcommand_required(true)
                .arg_required_else_help(true)
                .subcommand(Command::new("list").visible_alias("l").about("List all desktops"))
                .subcommand(
                    Command::new("switch")
                        .visible_alias("s")
                        .about("Switch to a desktop")
                        .arg(Arg::new("DESKTOP").required(true)),
                )
                .subcommand(
                    Command::new("names")
                        .visible_alias("n")
                        .about("Show or set the desktop names")
                        .arg(Arg::new("NAMES").num_args(0..)),
                )
                .subcommand(
                    Command::new("count")
                        .visible_alias("c")
                        .about("Show or change the number of desktops")
                        .arg(Arg::new("COUNT")),
                ),
        )
        .subcommand(Command::new("watch").about("Print active window and desktop changes until interrupted"))
}

fn main() {
    let matches = cli().get_matches();
    init_logging(matches.get_count("verbose"));
    if let Err(err) = run(&matches) {
        eprintln!("{}: {:?}", "error".red(), err);
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt().with_max_level(level).with_writer(std::io::stderr).init();
}

fn run(matches: &ArgMatches) -> Result<()> {
    let mut opts = ConnectOptions::new().prime_ewmh();
    if let Some(display) = matches.get_one::<String>("display") {
        opts = opts.display(display.as_str());
    }
    let wm = WindowManager::open(&opts).wrap("failed to connect to the X server")?;

    match matches.subcommand() {
        Some(("info", _)) => info(&wm),
        Some(("window", sub)) => match sub.subcommand() {
            Some(("list", m)) => list(&wm, m.get_flag("all")),
            Some(("close", m)) => {
                let win = target(&wm, m)?;
                if m.get_flag("delete") {
                    wm.send_delete_window(win, CURRENT_TIME).pass()?;
                } else {
                    wm.request_close_window(win, CURRENT_TIME, Source::Pager).pass()?;
                }
                wm.flush().pass()
            },
            Some(("state", m)) => state(&wm, m),
            Some(("activate", m)) => {
                let win = parse_window(value(m, "WINDOW"))?;
                wm.activate_win(win).pass()
            },
            Some(("move", m)) => {
                let win = target(&wm, m)?;
                let style = FrameStyle::try_from(value(m, "frame")).pass()?;
                let x = value(m, "X").parse::<i32>().wrap("invalid x coordinate")?;
                let y = value(m, "Y").parse::<i32>().wrap("invalid y coordinate")?;
                let w = optional::<u32>(m, "WIDTH").wrap("invalid width")?;
                let h = optional::<u32>(m, "HEIGHT").wrap("invalid height")?;
                wm.moveresize(win, style, Some(x), Some(y), w, h).pass()
            },
            Some(("desktop", m)) => {
                let win = target(&wm, m)?;
                let desktop = value(m, "DESKTOP").parse::<u32>().wrap("invalid desktop")?;
                wm.request_wm_desktop(win, desktop, Source::Pager).pass()?;
                wm.flush().pass()
            },
            _ => unreachable!(),
        },
        Some(("desktop", sub)) => match sub.subcommand() {
            Some(("list", _)) => desktops(&wm),
            Some(("switch", m)) => {
                let desktop = value(m, "DESKTOP").parse::<u32>().wrap("invalid desktop")?;
                wm.request_current_desktop(desktop, CURRENT_TIME).pass()?;
                wm.flush().pass()
            },
            Some(("names", m)) => match m.get_many::<String>("NAMES") {
                Some(names) => {
                    let names: Vec<String> = names.cloned().collect();
                    wm.set_desktop_names_checked(&names).pass()?.check().pass()
                },
                None => {
                    for name in wm.get_desktop_names().pass()?.reply().pass()? {
                        println!("{}", name);
                    }
                    Ok(())
                },
            },
            Some(("count", m)) => match optional::<u32>(m, "COUNT").wrap("invalid desktop count")? {
                Some(count) => {
                    wm.request_number_of_desktops(count).pass()?;
                    wm.flush().pass()
                },
                None => {
                    println!("{}", wm.get_number_of_desktops().pass()?.reply().pass()?);
                    Ok(())
                },
            },
            _ => unreachable!(),
        },
        Some(("watch", _)) => watch(&wm),
        _ => unreachable!(),
    }
}

// Get a required or defaulted string argument, clap guarantees it is there
fn value<'a>(m: &'a ArgMatches, name: &str) -> &'a str {
    m.get_one::<String>(name).map(|x| x.as_str()).unwrap_or_default()
}

fn optional<T: std::str::FromStr>(m: &ArgMatches, name: &str) -> std::result::Result<Option<T>, T::Err> {
    m.get_one::<String>(name).map(|x| x.parse::<T>()).transpose()
}

// Window ids are accepted in decimal or as 0x prefixed hex the way xprop prints them
fn parse_window(val: &str) -> Result<Window> {
    match val.strip_prefix("0x") {
        Some(hex) => u32::from_str_radix(hex, 16).wrap("invalid window id"),
        None => val.parse::<u32>().wrap("invalid window id"),
    }
}

// The window given with --window or the active window
fn target(wm: &WindowManager, m: &ArgMatches) -> Result<Window> {
    match m.get_one::<String>("window") {
        Some(val) => parse_window(val),
        None => wm.get_active_window().pass()?.reply().wrap("no active window"),
    }
}

fn info(wm: &WindowManager) -> Result<()> {
    let (_, wm_name) = wm.winmgr().pass()?;
    let desktops = wm.get_number_of_desktops().pass()?;
    let workarea = wm.get_workarea_unchecked().pass()?;
    let active = wm.get_active_window().pass()?;
    println!("{}", "X11 Information".cyan());
    println!("-----------------------------------------------------------------------");
    println!("Window Manager:    {}", wm_name);
    println!("Composite Manager: {}", wm.composite_manager().pass()?);
    println!("Root Window:       {}", wm.root());
    println!("Screen Size:       {}x{}", wm.width(), wm.height());
    match workarea.reply().ok().and_then(|x| x.into_iter().next()) {
        Some(area) => println!("Work area:         {}x{}+{}+{}", area.width, area.height, area.x, area.y),
        None => println!("Work area:         unknown"),
    }
    println!("Desktops:          {}", desktops.reply().pass()?);
    println!();
    println!("{}", "Active Window".cyan());
    println!("{:-<120}", "");
    print_win_header();
    print_win_details(wm, active.reply().pass()?)
}

fn list(wm: &WindowManager, all: bool) -> Result<()> {
    print_win_header();
    for win in wm.get_windows(all).pass()? {
        print_win_details(wm, win)?;
    }
    Ok(())
}

fn state(wm: &WindowManager, m: &ArgMatches) -> Result<()> {
    let win = target(wm, m)?;
    let change = [("add", StateAction::Add), ("remove", StateAction::Remove), ("toggle", StateAction::Toggle)]
        .into_iter()
        .find_map(|(name, action)| m.get_one::<String>(name).map(|x| (action, x)));
    match change {
        Some((action, name)) => {
            let state = WinState::try_from(name.as_str()).pass()?;
            wm.request_wm_state(win, action, &state, None, Source::Pager).pass()?;
            wm.flush().pass()
        },
        None => {
            for state in wm.win_state(win).pass()? {
                println!("{}", state);
            }
            Ok(())
        },
    }
}

fn desktops(wm: &WindowManager) -> Result<()> {
    let count = wm.get_number_of_desktops().pass()?;
    let current = wm.get_current_desktop().pass()?;
    let names = wm.get_desktop_names_unchecked().pass()?;
    let (count, current) = (count.reply().pass()?, current.reply().pass()?);
    let names = names.reply().unwrap_or_default();
    for i in 0..count {
        let name = names.get(i as usize).map(|x| x.as_str()).unwrap_or("");
        if i == current {
            println!("{} {:>2} {}", "*".green(), i, name);
        } else {
            println!("  {:>2} {}", i, name);
        }
    }
    Ok(())
}

fn watch(wm: &WindowManager) -> Result<()> {
    let active = wm.atom("_NET_ACTIVE_WINDOW").pass()?;
    let desktop = wm.atom("_NET_CURRENT_DESKTOP").pass()?;
    wm.listen(wm.root(), EventMask::PROPERTY_CHANGE).pass()?;
    wm.connect(EventKind::PropertyNotify, Some(wm.root()), move |wm, e| {
        match e.property() {
            Some(atom) if atom == active => {
                let win = wm.get_active_window()?.reply()?;
                println!("{} {:0>8} {}", "active".cyan(), win, wm.win_name(win).unwrap_or_default());
            },
            Some(atom) if atom == desktop => {
                println!("{} {}", "desktop".cyan(), wm.get_current_desktop()?.reply()?);
            },
            _ => (),
        }
        Ok(())
    });
    wm.main_loop().pass()
}

fn print_win_header() {
    println!(
        "{:<8} {:<3} {:<6} {:<5} {:<5} {:<4} {:<4} {:<8} {:<7} {:<18} {:<18} {}",
        "ID", "DSK", "PID", "X", "Y", "W", "H", "BORDERS", "TYPE", "STATE", "CLASS", "NAME"
    );
}

fn print_win_details(wm: &WindowManager, win: Window) -> Result<()> {
    let pid = wm.win_pid(win).map(|x| x.to_string()).unwrap_or_else(|_| "-".to_owned());
    let desktop = match wm.win_desktop(win) {
        Ok(0xFFFFFFFF) => "*".to_owned(),
        Ok(x) => x.to_string(),
        Err(_) => "-".to_owned(),
    };
    let typ = wm.win_type(win).map(|x| x.to_string()).unwrap_or_else(|_| "-".to_owned());
    let states = wm.win_state(win).unwrap_or_default();
    let g = wm.win_geometry(win).pass()?;
    let b = wm.win_borders(win).unwrap_or_default();
    let class = wm.win_class(win).unwrap_or_default();
    let name = wm.win_name(win).unwrap_or_default();
    println!(
        "{:<8} {:<3} {:<6} {:<5} {:<5} {:<4} {:<4} {:<8} {:<7} {:<18} {:<18} {}",
        format!("{:0>8}", win),
        format!("{:>2}", desktop),
        pid,
        g.x,
        g.y,
        g.width,
        g.height,
        format!("{},{},{},{}", b.left, b.right, b.top, b.bottom),
        typ,
        states.iter().map(|x| x.to_string()).collect::<Vec<_>>().join(","),
        class,
        name
    );
    Ok(())
}
