mod entry;
mod history;
mod navigation;
mod source;

use clap::Parser;
use reqwest::Url;
use std::io::{self, BufRead, Write};
use tracing::{warn, Level};
use tracing_subscriber::FmtSubscriber;

use crate::history::MemoryHistory;
use crate::navigation::{Action, NavigationClient, Phase};
use crate::source::HttpListingSource;

#[derive(Parser, Debug)]
#[command(author, version, about = "Terminal navigator for an xplore server", long_about = None)]
struct Args {
    #[arg(long, env = "XPLORE_SERVER", default_value = "http://localhost:9001")]
    server: String,

    /// Directory to open first, as if it were in the page URL.
    #[arg(long)]
    path: Option<String>,
}

#[derive(Debug, PartialEq, Eq)]
enum Command {
    List,
    Open(String),
    Crumb(usize),
    Back,
    Forward,
    Reload,
    Quit,
    Help,
}

fn parse_command(line: &str) -> Option<Command> {
    let line = line.trim();
    let (word, rest) = line.split_once(' ').unwrap_or((line, ""));
    let rest = rest.trim();

    match word {
        "" | "ls" => Some(Command::List),
        "open" | "cd" if !rest.is_empty() => Some(Command::Open(rest.to_string())),
        "crumb" => rest.parse().ok().map(Command::Crumb),
        "back" => Some(Command::Back),
        "forward" => Some(Command::Forward),
        "reload" => Some(Command::Reload),
        "quit" | "exit" => Some(Command::Quit),
        "help" => Some(Command::Help),
        _ => None,
    }
}

// -----------------------------------------------------------------------------
// main()
// -----------------------------------------------------------------------------

fn main() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_writer(io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();
    let source = HttpListingSource::new(&args.server)?;

    match source.disk_usage() {
        Ok(du) => println!(
            "{} on {}: {} used of {} ({}), {} free",
            du.filesystem, du.mounted_on, du.used, du.size, du.use_percentage, du.available
        ),
        Err(e) => warn!("Error fetching disk usage: {:#}", e),
    }

    let mut page = Url::parse(&args.server)?;
    page.set_path("/");
    if let Some(path) = &args.path {
        page.query_pairs_mut().append_pair("path", path);
    }

    let mut client = NavigationClient::new(source, MemoryHistory::new(page));
    client.start();
    render(&client);

    let stdin = io::stdin();
    prompt()?;
    for line in stdin.lock().lines() {
        let line = line?;
        match parse_command(&line) {
            Some(Command::Quit) => break,
            Some(cmd) => {
                run(&mut client, cmd)?;
            }
            None => println!("unknown command; try `help`"),
        }
        prompt()?;
    }

    Ok(())
}

fn prompt() -> io::Result<()> {
    print!("> ");
    io::stdout().flush()
}

type Client = NavigationClient<HttpListingSource, MemoryHistory>;

fn run(client: &mut Client, cmd: Command) -> anyhow::Result<()> {
    match cmd {
        Command::List => render(client),
        Command::Open(target) => {
            let found = match target.parse::<usize>() {
                Ok(i) => client.view().entries().nth(i).cloned(),
                Err(_) => client.view().entries().find(|e| e.name == target).cloned(),
            };
            let Some(entry) = found else {
                println!("no entry {:?}", target);
                return Ok(());
            };

            let page = client.history().current_url().clone();
            match client.click_entry(&entry, &page)? {
                Action::Navigated => render(client),
                Action::OpenView(url) => println!("view: {}", url),
            }
        }
        Command::Crumb(i) => {
            if client.click_crumb(i) {
                render(client);
            } else {
                println!("no breadcrumb segment {}", i);
            }
        }
        Command::Back => match client.history_mut().back() {
            Some(state) => {
                client.on_pop_state(state);
                render(client);
            }
            None => println!("already at the oldest entry"),
        },
        Command::Forward => match client.history_mut().forward() {
            Some(state) => {
                client.on_pop_state(state);
                render(client);
            }
            None => println!("already at the newest entry"),
        },
        Command::Reload => {
            let path = client.state().current_path.clone();
            client.open(&path);
            render(client);
        }
        Command::Help => {
            println!("ls | open <n|name> | crumb <n> | back | forward | reload | quit");
        }
        Command::Quit => {}
    }
    Ok(())
}

fn render(client: &Client) {
    if client.phase() == Phase::Error {
        println!("(listing failed; showing previous directory)");
    }

    let crumbs: Vec<String> = client
        .state()
        .breadcrumb
        .iter()
        .enumerate()
        .map(|(i, c)| format!("[{}] {}", i, c.label))
        .collect();
    println!("{}", crumbs.join(" / "));
    println!("{} items", client.view().item_count());

    for (i, e) in client.view().entries().enumerate() {
        let marker = if e.is_dir() { "/" } else { "" };
        println!("{:>4}  {}{}  {}", i, e.name, marker, e.summary());
    }
}
