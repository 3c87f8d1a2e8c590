use std::sync::Arc;

use anyhow::{Context, Result};
use livefilter::logging::{info, obj, v_str, Domain};
use livefilter::net::HttpTransport;
use livefilter::page::PageDecl;
use livefilter::sched::lock;
use livefilter::state::DateField;
use livefilter::{Config, FilterSession};
use tokio::io::{AsyncBufReadExt, BufReader};

const HELP: &str = "\
commands:
  check <facet> <value>     select a value
  uncheck <facet> <value>   deselect a value
  date start|end <value>    type into a date field (empty clears)
  search <text>             type into the search box
  retry                     retry a failed search
  find <facet> <text>       reorder a facet list locally
  show [facet]              print rendered lists
  submit                    print the submitted query string
  quit";

fn show(session: &FilterSession, facet: Option<&str>) {
    let view = lock(session.view());
    let snapshot = session.store().snapshot();
    for name in snapshot.selections.keys() {
        if facet.is_some_and(|f| f != name.as_str()) {
            continue;
        }
        let Some(list) = view.page.list(name) else {
            continue;
        };
        match list.placeholder() {
            Some(p) => println!("{}: [{}]", name, p.text()),
            None => {
                let items: Vec<String> = list
                    .nodes()
                    .iter()
                    .map(|n| format!("{}{}", if n.checked { "*" } else { "" }, n.value))
                    .collect();
                println!("{}: {}", name, items.join(", "));
            }
        }
    }
    if let Some(rows) = view.page.summary().rows {
        println!("rows: {}", rows);
    }
}

fn handle(session: &FilterSession, line: &str) -> bool {
    let mut parts = line.trim().splitn(3, ' ');
    let cmd = parts.next().unwrap_or("");
    let a = parts.next().unwrap_or("");
    let b = parts.next().unwrap_or("");
    match cmd {
        "" => {}
        "check" | "uncheck" => {
            session.store().handle_checkbox_change(a, b, cmd == "check");
        }
        "date" => match a {
            "start" => session.store().handle_date_change(DateField::Start, b),
            "end" => session.store().handle_date_change(DateField::End, b),
            _ => println!("date start|end <value>"),
        },
        "search" => match session.search() {
            Some(search) => search.on_input(line.trim().trim_start_matches("search").trim_start()),
            None => println!("no search facet on this page"),
        },
        "retry" => {
            if !session.search().map(|s| s.retry()).unwrap_or(false) {
                println!("nothing to retry");
            }
        }
        "find" => match session.reorder(a) {
            Some(reorder) => println!("{}: {}", a, reorder.on_input(b).join(", ")),
            None => println!("unknown facet {}", a),
        },
        "show" => show(session, if a.is_empty() { None } else { Some(a) }),
        "submit" => println!("?{}", session.submit().query_string()),
        "quit" | "exit" => return false,
        _ => println!("{}", HELP),
    }
    true
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cfg = Config::from_env();
    let raw = std::fs::read_to_string(&cfg.page_path)
        .with_context(|| format!("reading page declaration {}", cfg.page_path))?;
    let decl: PageDecl = serde_json::from_str(&raw)
        .with_context(|| format!("parsing page declaration {}", cfg.page_path))?;
    let transport = Arc::new(HttpTransport::new(cfg.base_url.as_deref(), cfg.request_timeout())?);

    info(
        Domain::System,
        "startup",
        obj(&[
            ("page", v_str(&cfg.page_path)),
            ("options_endpoint", v_str(&decl.options_endpoint)),
        ]),
    );

    let session = FilterSession::init(&decl, cfg, transport)?;
    session.start();
    println!("{}", HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if !handle(&session, &line) {
            break;
        }
    }

    info(Domain::System, "shutdown", obj(&[]));
    Ok(())
}
