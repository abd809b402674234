//! ChainStore shell
//!
//! Builds a storage unit and a seen-keys time cache from command-line flags,
//! then executes one command per stdin line.

use bytes::Bytes;
use chainstore::cache::{CacheConfig, CacheType};
use chainstore::hashing::new_hasher;
use chainstore::monitoring::{convert_bytes, cumulated_size_in_bytes};
use chainstore::persister::{DbConfig, DbPersisterFactory, DbType};
use chainstore::storage::{new_storage_unit_from_unit_config, StorageUnit, Storer, UnitConfig};
use chainstore::timecache::{start_expiry_sweeper, TimeCache, TimeCacher};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::signal;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

/// Shell configuration
#[derive(Debug, Clone)]
struct Config {
    cache_type: CacheType,
    capacity: u32,
    size_in_bytes: u64,
    shards: u32,
    db_type: DbType,
    path: String,
    max_batch_size: usize,
    seen_ttl: Duration,
    log_level: Level,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_type: CacheType::Lru,
            capacity: 1000,
            size_in_bytes: 0,
            shards: 1,
            db_type: DbType::MemoryDb,
            path: String::new(),
            max_batch_size: 100,
            seen_ttl: Duration::from_secs(60),
            log_level: Level::INFO,
        }
    }
}

impl Config {
    /// Parse configuration from command-line arguments
    fn from_args() -> Self {
        let mut config = Config::default();
        let args: Vec<String> = std::env::args().collect();

        let mut i = 1;
        while i < args.len() {
            let flag = args[i].as_str();
            match flag {
                "--cache-type" | "-c" => config.cache_type = parse_value(&args, i, flag),
                "--capacity" => config.capacity = parse_value(&args, i, flag),
                "--size-in-bytes" => config.size_in_bytes = parse_value(&args, i, flag),
                "--shards" => config.shards = parse_value(&args, i, flag),
                "--db-type" | "-d" => config.db_type = parse_value(&args, i, flag),
                "--path" => config.path = parse_value(&args, i, flag),
                "--max-batch-size" => config.max_batch_size = parse_value(&args, i, flag),
                "--seen-ttl" => {
                    config.seen_ttl = Duration::from_secs(parse_value(&args, i, flag));
                }
                "--log-level" | "-l" => config.log_level = parse_value(&args, i, flag),
                "--help" | "-h" => {
                    print_help();
                    std::process::exit(0);
                }
                "--version" | "-v" => {
                    println!("ChainStore version {}", chainstore::VERSION);
                    std::process::exit(0);
                }
                _ => {
                    eprintln!("Unknown argument: {}", flag);
                    print_help();
                    std::process::exit(1);
                }
            }
            i += 2;
        }

        config
    }

    fn cache_config(&self) -> CacheConfig {
        CacheConfig::new("shell", self.cache_type)
            .with_capacity(self.capacity)
            .with_size_in_bytes(self.size_in_bytes)
            .with_shards(self.shards)
    }

    fn db_config(&self) -> DbConfig {
        DbConfig::new(self.path.clone(), self.db_type).with_batch(1, self.max_batch_size)
    }

    fn unit_config(&self) -> UnitConfig {
        UnitConfig::new(self.cache_config(), self.db_config())
    }
}

/// Parses the value following the flag at `args[i]`, exiting on failure.
fn parse_value<T>(args: &[String], i: usize, flag: &str) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let Some(raw) = args.get(i + 1) else {
        eprintln!("Error: {} requires a value", flag);
        std::process::exit(1);
    };

    raw.parse().unwrap_or_else(|e| {
        eprintln!("Error: invalid value for {}: {}", flag, e);
        std::process::exit(1);
    })
}

fn print_help() {
    println!(
        r#"
ChainStore - Tiered Storage Units for Node Data

USAGE:
    chainstore [OPTIONS]

OPTIONS:
    -c, --cache-type <TYPE>      LRU, SizeLRU or FIFOSharded (default: LRU)
        --capacity <N>           Maximum cached entries (default: 1000)
        --size-in-bytes <N>      Byte budget, SizeLRU only (default: 0)
        --shards <N>             Shard count, FIFOSharded only (default: 1)
    -d, --db-type <TYPE>         Persister kind (default: MemoryDB)
        --path <PATH>            Persister location (default: none)
        --max-batch-size <N>     Persister batch size (default: 100)
        --seen-ttl <SECONDS>     Lifetime of SEEN entries (default: 60)
    -l, --log-level <LEVEL>      trace, debug, info, warn or error (default: info)
    -v, --version                Print version information
    -h, --help                   Print this help message

COMMANDS (one per line on stdin):
    PUT <key> <value>     Store a value
    GET <key>             Read a value
    HAS <key>             Check whether a key is stored
    DEL <key>             Remove a key
    KEYS                  List persisted keys
    SEEN <key>            Record a key, report whether it was seen recently
    HASH <alg> <data>     Hash data with Keccak, Blake2b or Fnv
    STATS                 Show cache statistics
    QUIT                  Exit

EXAMPLES:
    $ printf 'PUT a 1\nGET a\n' | chainstore --capacity 2 --max-batch-size 2
    OK
    "1"
"#
    );
}

/// Outcome of one shell command
#[derive(Debug, PartialEq, Eq)]
enum Reply {
    Output(String),
    Quit,
}

/// Executes shell commands against a storage unit and a seen-keys cache.
struct Shell {
    unit: StorageUnit,
    seen: Arc<TimeCache>,
}

impl Shell {
    fn new(unit: StorageUnit, seen: Arc<TimeCache>) -> Self {
        Self { unit, seen }
    }

    fn execute(&self, line: &str) -> Reply {
        let line = line.trim();
        let (command, rest) = match line.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest.trim()),
            None => (line, ""),
        };

        let output = match command.to_ascii_uppercase().as_str() {
            "" => return Reply::Output(String::new()),
            "QUIT" | "EXIT" => return Reply::Quit,
            "PUT" => match rest.split_once(char::is_whitespace) {
                Some((key, value)) => self.put(key, value.trim()),
                None => "(error) usage: PUT <key> <value>".to_string(),
            },
            "GET" if !rest.is_empty() => match self.unit.get(rest.as_bytes()) {
                Ok(value) => format!("{:?}", String::from_utf8_lossy(&value)),
                Err(e) => format!("(error) {}", e),
            },
            "HAS" if !rest.is_empty() => match self.unit.has(rest.as_bytes()) {
                Ok(()) => "(integer) 1".to_string(),
                Err(_) => "(integer) 0".to_string(),
            },
            "DEL" if !rest.is_empty() => match self.unit.remove(rest.as_bytes()) {
                Ok(()) => "OK".to_string(),
                Err(e) => format!("(error) {}", e),
            },
            "KEYS" => self.keys(),
            "SEEN" if !rest.is_empty() => self.seen(rest),
            "HASH" => match rest.split_once(char::is_whitespace) {
                Some((alg, data)) => match new_hasher(alg) {
                    Ok(hasher) => hex::encode(hasher.compute(data.trim().as_bytes())),
                    Err(e) => format!("(error) {}", e),
                },
                None => "(error) usage: HASH <alg> <data>".to_string(),
            },
            "STATS" => self.stats(),
            "GET" | "HAS" | "DEL" | "SEEN" => {
                format!("(error) usage: {} <key>", command.to_ascii_uppercase())
            }
            _ => format!("(error) unknown command '{}'", command),
        };

        Reply::Output(output)
    }

    fn put(&self, key: &str, value: &str) -> String {
        match self.unit.put(key.as_bytes(), value.as_bytes()) {
            Ok(()) => "OK".to_string(),
            Err(e) => format!("(error) {}", e),
        }
    }

    fn keys(&self) -> String {
        let mut keys: Vec<Bytes> = Vec::new();
        self.unit.range_keys(&mut |key, _| {
            keys.push(Bytes::copy_from_slice(key));
            true
        });
        keys.sort();

        if keys.is_empty() {
            return "(empty)".to_string();
        }

        keys.iter()
            .enumerate()
            .map(|(i, key)| format!("{}) {:?}", i + 1, String::from_utf8_lossy(key)))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn seen(&self, key: &str) -> String {
        if self.seen.has(key) {
            return "seen".to_string();
        }

        match self.seen.add(key) {
            Ok(()) => "new".to_string(),
            Err(e) => format!("(error) {}", e),
        }
    }

    fn stats(&self) -> String {
        let stats = self.unit.stats();
        format!(
            "cached_entries:{}\ncached_bytes:{}\nmax_cached_entries:{}\nseen_entries:{}\ncumulated_cache_capacity:{}",
            stats.cached_entries,
            convert_bytes(stats.cached_bytes),
            stats.max_cached_entries,
            self.seen.len(),
            convert_bytes(cumulated_size_in_bytes())
        )
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_args();

    // Logs go to stderr, replies to stdout
    FmtSubscriber::builder()
        .with_max_level(config.log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let unit_conf = config.unit_config();
    let factory = DbPersisterFactory::new(unit_conf.db_conf.clone());

    let unit = new_storage_unit_from_unit_config(&unit_conf, &factory)?;
    info!(
        cache = %unit_conf.cache_conf,
        db_type = %unit_conf.db_conf.db_type,
        "Storage unit ready"
    );

    let seen = Arc::new(TimeCache::new(config.seen_ttl));
    let _sweeper = start_expiry_sweeper(seen.clone());

    let shell = Shell::new(unit, seen);

    let shutdown = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Shutdown signal received");
    };

    tokio::select! {
        result = run(&shell) => result?,
        _ = shutdown => {}
    }

    if let Err(e) = shell.unit.close() {
        error!("Failed to close storage unit: {}", e);
    }

    info!("Shell exited");
    Ok(())
}

/// Reads stdin line by line until EOF or QUIT
async fn run(shell: &Shell) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await? {
        match shell.execute(&line) {
            Reply::Quit => break,
            Reply::Output(output) if output.is_empty() => {}
            Reply::Output(output) => {
                stdout.write_all(output.as_bytes()).await?;
                stdout.write_all(b"\n").await?;
                stdout.flush().await?;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainstore::timecache::ManualClock;

    fn shell() -> (Shell, Arc<ManualClock>) {
        let config = Config {
            capacity: 2,
            max_batch_size: 2,
            ..Default::default()
        };
        let unit_conf = config.unit_config();
        let factory = DbPersisterFactory::new(unit_conf.db_conf.clone());
        let unit = new_storage_unit_from_unit_config(&unit_conf, &factory).unwrap();

        let clock = Arc::new(ManualClock::new());
        let seen = Arc::new(TimeCache::with_clock(Duration::from_secs(5), clock.clone()));
        (Shell::new(unit, seen), clock)
    }

    fn output(shell: &Shell, line: &str) -> String {
        match shell.execute(line) {
            Reply::Output(output) => output,
            Reply::Quit => panic!("unexpected quit"),
        }
    }

    #[test]
    fn test_put_get_del() {
        let (shell, _) = shell();

        assert_eq!(output(&shell, "PUT a hello world"), "OK");
        assert_eq!(output(&shell, "get a"), "\"hello world\"");
        assert_eq!(output(&shell, "HAS a"), "(integer) 1");
        assert_eq!(output(&shell, "DEL a"), "OK");
        assert_eq!(output(&shell, "HAS a"), "(integer) 0");
        assert!(output(&shell, "GET a").starts_with("(error) key not found"));
    }

    #[test]
    fn test_keys_lists_evicted_entries() {
        let (shell, _) = shell();
        for key in ["c", "a", "b"] {
            shell.execute(&format!("PUT {} v", key));
        }

        assert_eq!(output(&shell, "KEYS"), "1) \"a\"\n2) \"b\"\n3) \"c\"");
        assert!(output(&shell, "STATS").contains("cached_entries:2"));
    }

    #[test]
    fn test_seen_expires() {
        let (shell, clock) = shell();

        assert_eq!(output(&shell, "SEEN peer"), "new");
        assert_eq!(output(&shell, "SEEN peer"), "seen");

        clock.advance(Duration::from_secs(5));
        assert_eq!(output(&shell, "SEEN peer"), "new");
    }

    #[test]
    fn test_hash() {
        let (shell, _) = shell();

        assert_eq!(
            output(&shell, "HASH Keccak abc"),
            "4e03657aea45a94fc7d47ba826c8d667c0d1e6e33a64a036ec44f58fa12d6c45"
        );
        assert!(output(&shell, "HASH Md5 abc").starts_with("(error) hash type not supported"));
    }

    #[test]
    fn test_usage_and_quit() {
        let (shell, _) = shell();

        assert_eq!(output(&shell, ""), "");
        assert!(output(&shell, "PUT onlykey").starts_with("(error) usage"));
        assert!(output(&shell, "GET").starts_with("(error) usage"));
        assert!(output(&shell, "FLY").starts_with("(error) unknown command"));
        assert_eq!(shell.execute("quit"), Reply::Quit);
    }
}
