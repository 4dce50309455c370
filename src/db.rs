use log::info;
use mongodb::bson::{doc, Document};
use mongodb::options::{ClientOptions, IndexOptions};
use mongodb::{Client, Database, IndexModel};

use crate::store::mongo::{TODOS, USERS};

pub struct MongoDB {
    pub client: Client,
    pub db: Database,
}

impl MongoDB {
    /// Connects, pings the server and makes sure the indexes exist. Any
    /// failure here should abort startup.
    pub async fn init(uri: &str, db_name: &str) -> mongodb::error::Result<Self> {
        let client_options = ClientOptions::parse(uri).await?;
        let client = Client::with_options(client_options)?;
        let db = client.database(db_name);

        db.run_command(doc! { "ping": 1 }).await?;
        info!("Connected to MongoDB database {}", db_name);

        let mongodb = MongoDB { client, db };
        mongodb.ensure_indexes().await?;
        Ok(mongodb)
    }

    async fn ensure_indexes(&self) -> mongodb::error::Result<()> {
        let unique_email = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        self.db
            .collection::<Document>(USERS)
            .create_index(unique_email)
            .await?;

        let by_owner = IndexModel::builder()
            .keys(doc! { "userId": 1, "isDeleted": 1 })
            .build();
        self.db
            .collection::<Document>(TODOS)
            .create_index(by_owner)
            .await?;
        Ok(())
    }
}
