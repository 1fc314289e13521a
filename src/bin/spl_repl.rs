use nl_spl_engine::config::AppConfig;
use nl_spl_engine::engine::{QueryResponse, SplQueryEngine};
use nl_spl_engine::history::{QueryHistory, QueryKind};
use nl_spl_engine::logging::init_tracing;
use nl_spl_engine::validators::{sanitize_input, validate_question, validate_spl_query};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

const MAX_RESULTS: usize = 100;
const ROWS_TO_SHOW: usize = 20;

#[derive(Debug, PartialEq)]
enum Command {
    Ask(String),
    Spl(String),
    Enhance(String),
    Suggest(String),
    Indexes,
    Jobs,
    Health,
    History,
    Help,
    Quit,
    Empty,
    Unknown(String),
}

fn parse_command(line: &str) -> Command {
    let raw = line.replace('\0', "");
    let raw = raw.trim();
    // SPL string literals keep their inner whitespace
    if let Some(query) = raw.strip_prefix("spl ") {
        return Command::Spl(query.trim().to_string());
    }

    let line = sanitize_input(raw);
    if line.is_empty() {
        return Command::Empty;
    }

    if let Some(rest) = line.strip_prefix(':') {
        let (name, arg) = match rest.split_once(' ') {
            Some((name, arg)) => (name, arg.trim().to_string()),
            None => (rest, String::new()),
        };
        return match name {
            "enhance" => Command::Enhance(arg),
            "suggest" => Command::Suggest(arg),
            "indexes" => Command::Indexes,
            "jobs" => Command::Jobs,
            "health" => Command::Health,
            "history" => Command::History,
            "help" => Command::Help,
            "quit" | "q" | "exit" => Command::Quit,
            other => Command::Unknown(other.to_string()),
        };
    }

    Command::Ask(line)
}

fn print_help() {
    println!(" Type a question to translate and run it.");
    println!("    spl <query>          run raw SPL");
    println!("    :enhance <feedback>  improve the last query");
    println!("    :suggest <text>      example questions");
    println!("    :indexes  :jobs  :health  :history  :quit");
}

fn print_response(response: &QueryResponse) {
    if !response.spl_query.is_empty() {
        println!("\n SPL: {}", response.spl_query);
    }
    if let Some(explanation) = response.explanation.as_deref().filter(|e| !e.is_empty()) {
        println!(" Explanation: {}", explanation);
    }
    if let Some(confidence) = response.confidence {
        println!(" Confidence: {}", confidence.as_str());
    }

    if !response.success {
        println!(" Error: {}", response.error.as_deref().unwrap_or("unknown error"));
        println!();
        return;
    }

    let reported = response.statistics.as_ref().map(|s| s.result_count).unwrap_or(0);
    println!(
        " Result: {} rows returned in {:.2}s (backend reported {})",
        response.result_count, response.processing_time, reported
    );
    for row in response.results.iter().take(ROWS_TO_SHOW) {
        println!("   {}", serde_json::Value::Object(row.clone()));
    }
    if response.result_count > ROWS_TO_SHOW {
        println!("\n... (showing first {} of {} rows)", ROWS_TO_SHOW, response.result_count);
    }
    println!();
}

struct Repl {
    engine: SplQueryEngine,
    history: QueryHistory,
    last_query: Option<String>,
}

impl Repl {
    /// Returns false when the session should end
    async fn handle(&mut self, command: Command) -> bool {
        match command {
            Command::Empty => {}
            Command::Quit => return false,
            Command::Help => print_help(),
            Command::Unknown(name) => println!(" Unknown command ':{}' (try :help)", name),
            Command::Ask(question) => {
                if let Err(e) = validate_question(&question) {
                    println!(" {}", e);
                    return true;
                }
                let response = self.engine.run_natural_language(&question, MAX_RESULTS).await;
                self.remember(QueryKind::Natural, &question, &response).await;
                print_response(&response);
            }
            Command::Spl(query) => {
                if let Err(e) = validate_spl_query(&query) {
                    println!(" {}", e);
                    return true;
                }
                let response = self.engine.run_spl(&query, MAX_RESULTS).await;
                self.remember(QueryKind::Spl, &query, &response).await;
                print_response(&response);
            }
            Command::Enhance(feedback) => match &self.last_query {
                None => println!(" Run a query first"),
                Some(query) => {
                    let result = self.engine.enhance_query(query, &feedback).await;
                    if result.success {
                        println!("\n Enhanced: {}", result.enhanced_query);
                        println!(" Changes: {}", result.changes);
                        println!(" Confidence: {}\n", result.confidence.as_str());
                        self.last_query = Some(result.enhanced_query);
                    } else {
                        println!(" Error: {}", result.error.unwrap_or_default());
                    }
                }
            },
            Command::Suggest(partial) => {
                let suggestions = self.engine.suggest_questions(&partial);
                if suggestions.is_empty() {
                    println!(" No suggestions");
                }
                for s in suggestions {
                    println!("   {}", s);
                }
            }
            Command::Indexes => {
                for index in self.engine.list_indexes().await {
                    println!("   {}", index);
                }
            }
            Command::Jobs => {
                for job in self.engine.list_recent_jobs(10).await {
                    println!(
                        "   {}  {:>6} results  {:.2}s  {}",
                        job.id, job.result_count, job.duration_seconds, job.search_text
                    );
                }
            }
            Command::Health => {
                let health = self.engine.get_health().await;
                println!(" Overall: {:?}", health.overall);
                for (name, component) in &health.components {
                    println!(
                        "   {}: {} {}",
                        name,
                        component.status,
                        component.detail.as_deref().unwrap_or("")
                    );
                }
            }
            Command::History => {
                for entry in self.history.entries().await {
                    let mark = if entry.success { "ok" } else { "failed" };
                    println!(
                        "   [{}] {:?} {} -> {} ({} rows)",
                        entry.timestamp.format("%H:%M:%S"),
                        entry.kind,
                        entry.input,
                        mark,
                        entry.result_count
                    );
                }
            }
        }
        true
    }

    async fn remember(&mut self, kind: QueryKind, input: &str, response: &QueryResponse) {
        self.history
            .record(
                kind,
                input,
                response.spl_query.clone(),
                response.success,
                response.result_count,
                response.processing_time,
            )
            .await;
        if !response.spl_query.is_empty() {
            self.last_query = Some(response.spl_query.clone());
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env();
    init_tracing(if config.debug { "debug" } else { "warn" });

    println!(" Natural Language to SPL - Interactive Query Tool");
    println!("{}", "=".repeat(80));
    if let Err(e) = config.validate() {
        println!("  {}", e);
        println!("   Queries will fail until the configuration is complete.");
    }
    print_help();
    println!();

    let mut repl = Repl {
        engine: SplQueryEngine::from_config(&config)?,
        history: QueryHistory::default(),
        last_query: None,
    };

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("spl> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        if !repl.handle(parse_command(&line)).await {
            break;
        }
    }

    println!(" Bye");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command() {
        assert_eq!(parse_command("  show me   errors "), Command::Ask("show me errors".to_string()));
        assert_eq!(
            parse_command("spl search index=main | head 5"),
            Command::Spl("search index=main | head 5".to_string())
        );
        assert_eq!(parse_command(":enhance add a time range"), Command::Enhance("add a time range".to_string()));
        assert_eq!(parse_command(":suggest"), Command::Suggest(String::new()));
        assert_eq!(parse_command(":quit"), Command::Quit);
        assert_eq!(parse_command(":nope"), Command::Unknown("nope".to_string()));
        assert_eq!(parse_command("\0 \t"), Command::Empty);
    }

    #[test]
    fn test_spl_command_keeps_literal_whitespace() {
        assert_eq!(
            parse_command("  spl search msg=\"a  b\"\tuser=\"x\0\" "),
            Command::Spl("search msg=\"a  b\"\tuser=\"x\"".to_string())
        );
        assert_eq!(
            parse_command("why   did  login fail"),
            Command::Ask("why did login fail".to_string())
        );
    }
}
