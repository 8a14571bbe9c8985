use crate::config::Settings;
use crate::placeholder::{ExtractorError, ExtractorRegistry};
use crate::store::ExtractStore;
use crate::utils::value::to_text;
use rand::seq::IndexedRandom;
use serde_json::Value;
use std::sync::Arc;

/// 注册内置提取函数
///
/// - `get_extract_data(node[, selector])`
/// - `timestamp()`
/// - `read_csv_data(file[, row])`
/// - `get_baseurl(name)`
pub fn register_builtins(
    registry: &mut ExtractorRegistry,
    store: Arc<ExtractStore>,
    settings: Arc<Settings>,
) {
    let extract_store = Arc::clone(&store);
    registry.register("get_extract_data", move |args: &[String]| {
        get_extract_data(&extract_store, args)
    });

    registry.register("timestamp", |args: &[String]| {
        expect_args(args, 0, 0)?;
        Ok(Value::from(chrono::Utc::now().timestamp()))
    });

    let csv_settings = Arc::clone(&settings);
    registry.register("read_csv_data", move |args: &[String]| {
        read_csv_data(&csv_settings, args)
    });

    registry.register("get_baseurl", move |args: &[String]| {
        expect_args(args, 1, 1)?;
        Ok(Value::from(settings.api_envi.get(&args[0])?))
    });
}

fn expect_args(args: &[String], min: usize, max: usize) -> Result<(), ExtractorError> {
    if (min..=max).contains(&args.len()) {
        Ok(())
    } else {
        let expected = if min == max {
            min.to_string()
        } else {
            format!("{}-{}", min, max)
        };
        Err(ExtractorError::Arity {
            expected,
            actual: args.len(),
        })
    }
}

/// 读取提取存储中的数据
///
/// selector 为数字时按列表处理：
/// `0` 随机取一个，`-1` 逗号拼接为字符串，`-2` 拼接后再拆分为字符串列表，
/// 其余正数按 1 开始的序号取值；非数字 selector 作为二级 key 读取。
fn get_extract_data(store: &ExtractStore, args: &[String]) -> Result<Value, ExtractorError> {
    expect_args(args, 1, 2)?;
    let node = args[0].as_str();

    let Some(selector) = args.get(1) else {
        return Ok(store.read(node, None)?);
    };

    match selector.parse::<i64>() {
        Ok(index) => select_from_list(store.read(node, None)?, index),
        Err(_) => Ok(store.read(node, Some(selector))?),
    }
}

fn select_from_list(data: Value, index: i64) -> Result<Value, ExtractorError> {
    let Value::Array(items) = data else {
        return Err(ExtractorError::InvalidArgument(format!(
            "selector {} requires a list value, got {}",
            index, data
        )));
    };

    let joined = || items.iter().map(to_text).collect::<Vec<_>>().join(",");

    match index {
        0 => items.choose(&mut rand::rng()).cloned().ok_or_else(|| {
            ExtractorError::InvalidArgument("cannot pick from an empty list".to_string())
        }),
        -1 => Ok(Value::String(joined())),
        -2 => Ok(Value::Array(
            joined()
                .split(',')
                .map(|s| Value::String(s.to_string()))
                .collect(),
        )),
        n if n > 0 => items.get((n - 1) as usize).cloned().ok_or_else(|| {
            ExtractorError::InvalidArgument(format!(
                "index {} out of range for list of {}",
                n,
                items.len()
            ))
        }),
        n => Err(ExtractorError::InvalidArgument(format!(
            "unsupported selector {}",
            n
        ))),
    }
}

/// 读取数据目录下 CSV 文件的一行（默认第一行），返回各列
fn read_csv_data(settings: &Settings, args: &[String]) -> Result<Value, ExtractorError> {
    expect_args(args, 1, 2)?;
    let path = settings.data.dir.join(&args[0]);
    let row = match args.get(1) {
        Some(raw) => raw
            .parse::<usize>()
            .map_err(|_| ExtractorError::InvalidArgument(format!("invalid row index: {}", raw)))?,
        None => 0,
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(&path)?;
    let record = reader.records().nth(row).transpose()?.ok_or_else(|| {
        ExtractorError::InvalidArgument(format!("{} has no row {}", path.display(), row))
    })?;

    Ok(Value::Array(
        record
            .iter()
            .map(|col| Value::String(col.to_string()))
            .collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::placeholder::{PlaceholderError, PlaceholderResolver};
    use serde_json::json;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn setup() -> (TempDir, Arc<ExtractStore>, PlaceholderResolver) {
        let temp_dir = TempDir::new().unwrap();
        let store = Arc::new(ExtractStore::new(temp_dir.path().join("extract.jsonl")));

        let mut settings = Settings::default();
        settings.data.dir = temp_dir.path().to_path_buf();
        settings.api_envi.hosts = HashMap::from([(
            "admin".to_string(),
            "http://admin.local".to_string(),
        )]);

        let mut registry = ExtractorRegistry::new();
        register_builtins(&mut registry, Arc::clone(&store), Arc::new(settings));
        (temp_dir, store, PlaceholderResolver::new(registry))
    }

    #[test]
    fn test_get_extract_data() {
        let (_dir, store, resolver) = setup();
        store.write_entry("token", json!("abc")).unwrap();

        let output = resolver.resolve_str("${get_extract_data(token)}").unwrap();
        assert_eq!(output, "abc");
    }

    #[test]
    fn test_get_extract_data_subkey() {
        let (_dir, store, resolver) = setup();
        store
            .write(&json!({"Cookie": {"JSESSIONID": "s-1"}}))
            .unwrap();

        let output = resolver
            .resolve_str("${get_extract_data(Cookie,JSESSIONID)}")
            .unwrap();
        assert_eq!(output, "s-1");
    }

    #[test]
    fn test_get_extract_data_list_selectors() {
        let (_dir, store, resolver) = setup();
        store.write_entry("ids", json!([10, 20, 30])).unwrap();

        assert_eq!(resolver.resolve_str("${get_extract_data(ids,2)}").unwrap(), "20");
        assert_eq!(
            resolver.resolve_str("${get_extract_data(ids,-1)}").unwrap(),
            "10,20,30"
        );
        assert_eq!(
            resolver.resolve_str("${get_extract_data(ids,-2)}").unwrap(),
            "10,20,30"
        );

        let picked = resolver.resolve_str("${get_extract_data(ids,0)}").unwrap();
        assert!(["10", "20", "30"].contains(&picked.as_str()));

        assert!(resolver.resolve_str("${get_extract_data(ids,9)}").is_err());
    }

    #[test]
    fn test_get_extract_data_missing_key() {
        let (_dir, _store, resolver) = setup();
        let result = resolver.resolve_str("${get_extract_data(token)}");
        assert!(matches!(
            result,
            Err(PlaceholderError::Extractor {
                source: ExtractorError::Store(_),
                ..
            })
        ));
    }

    #[test]
    fn test_timestamp() {
        let (_dir, _store, resolver) = setup();
        let output = resolver.resolve_str("${timestamp()}").unwrap();
        assert_eq!(output.len(), 10);
        assert!(output.chars().all(|c| c.is_ascii_digit()));

        assert!(resolver.resolve_str("${timestamp(1)}").is_err());
    }

    #[test]
    fn test_read_csv_data() {
        let (dir, _store, resolver) = setup();
        std::fs::write(dir.path().join("users.csv"), "alice,secret1\n\nbob,secret2\n").unwrap();

        assert_eq!(
            resolver.resolve_str("${read_csv_data(users.csv)}").unwrap(),
            "alice,secret1"
        );
        assert_eq!(
            resolver.resolve_str("${read_csv_data(users.csv,1)}").unwrap(),
            "bob,secret2"
        );
    }

    #[test]
    fn test_read_csv_data_quoted_field() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("users.csv"), "\"smith, john\",pw\n").unwrap();
        let mut settings = Settings::default();
        settings.data.dir = temp_dir.path().to_path_buf();

        let row = read_csv_data(&settings, &["users.csv".to_string()]).unwrap();
        assert_eq!(row, json!(["smith, john", "pw"]));

        assert!(matches!(
            read_csv_data(&settings, &["users.csv".to_string(), "3".to_string()]),
            Err(ExtractorError::InvalidArgument(_))
        ));
        assert!(matches!(
            read_csv_data(&settings, &["missing.csv".to_string()]),
            Err(ExtractorError::Csv(_))
        ));
    }

    #[test]
    fn test_get_baseurl() {
        let (_dir, _store, resolver) = setup();
        assert_eq!(
            resolver.resolve_str("${get_baseurl(admin)}/login").unwrap(),
            "http://admin.local/login"
        );
        assert!(resolver.resolve_str("${get_baseurl(nope)}").is_err());
    }
}
