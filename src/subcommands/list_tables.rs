use color_eyre::Result;

use cirrus::dynamodb::KvStore;

pub struct Options {
    pub json: bool,
    pub prefix: String,
}

pub async fn command(store: &dyn KvStore, options: Options) -> Result<()> {
    let table_names: Vec<String> = store
        .list_tables()
        .await?
        .into_iter()
        .filter(|name| name.starts_with(&options.prefix))
        .collect();

    if options.json {
        println!("{}", serde_json::to_string(&table_names)?);
        return Ok(());
    }

    for table in table_names {
        println!("{table}");
    }
    Ok(())
}
