use color_eyre::{eyre::eyre, Result};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::warn;

use stockdash::aggregate::{self, DateRange, RecordFilter, Selection, SeriesPoint};
use stockdash::cache::{FetchCoordinator, Params};
use stockdash::config::Config;
use stockdash::inventory::resources::{self, search_params};
use stockdash::inventory::types::{
  ExpenseAnalysis, Notification, OrderByStatus, OrderSummary, PaymentByMethod, Product,
  ProductCreate, PurchaseAnalysis, SalesAnalysis, StatisticAnalysis, TopProduct,
  TransactionByType,
};
use stockdash::inventory::{self, HttpTransport};
use stockdash::persist::{KeyValueStorage, NoopStorage, Persistor, SqliteStorage};

use crate::{ChartKind, Command, PrefsAction};

/// Main application state
pub struct App {
  config: Config,
  persistor: Persistor,
}

impl App {
  /// Rehydrate persisted preferences. Nothing touches the network until a
  /// command needs it.
  pub async fn new(config: Config) -> Result<Self> {
    let storage = Self::open_storage(&config);
    let persistor = Persistor::rehydrate(storage, config.persistence.rehydrate_timeout()).await;
    Ok(Self { config, persistor })
  }

  fn open_storage(config: &Config) -> Arc<dyn KeyValueStorage> {
    if !config.persistence.enabled {
      return Arc::new(NoopStorage);
    }
    let opened = match &config.persistence.path {
      Some(path) => SqliteStorage::open(path),
      None => SqliteStorage::open_default(),
    };
    match opened {
      Ok(storage) => Arc::new(storage),
      Err(err) => {
        warn!(error = %err, "preferences will not be saved this session");
        Arc::new(NoopStorage)
      }
    }
  }

  fn connect(&self) -> Result<FetchCoordinator> {
    let transport = HttpTransport::from_config(&self.config)?;
    let sync = inventory::coordinator(&self.config, Arc::new(transport));
    sync.spawn_sweeper(self.config.cache.sweep_interval());
    Ok(sync)
  }

  pub async fn run(&self, command: Command) -> Result<()> {
    match command {
      Command::Prefs { action } => self.prefs(action).await,
      Command::Products { search } => {
        let sync = self.connect()?;
        let products: Vec<Product> = match search {
          Some(name) => load(&sync, resources::PRODUCTS_SEARCH, search_params(&name)).await?,
          None => load(&sync, resources::PRODUCTS, Params::new()).await?,
        };
        print_products(&products);
        Ok(())
      }
      Command::CreateProduct {
        name,
        price,
        rating,
      } => {
        let sync = self.connect()?;
        self.create_product(&sync, name, price, rating).await
      }
      Command::Chart {
        kind,
        only,
        start,
        end,
      } => {
        let sync = self.connect()?;
        let filter = RecordFilter {
          selection: only.map(Selection::Only).unwrap_or_default(),
          range: start.zip(end).map(|(s, e)| DateRange::new(s, e)),
        };
        let series = match kind {
          ChartKind::Orders => {
            let rows: Vec<OrderByStatus> =
              load(&sync, resources::ORDER_BY_STATUS, Params::new()).await?;
            aggregate::chart_series(&rows, &filter)
          }
          ChartKind::Payments => {
            let rows: Vec<PaymentByMethod> =
              load(&sync, resources::PAYMENT_BY_METHOD, Params::new()).await?;
            aggregate::chart_series(&rows, &filter)
          }
          ChartKind::Transactions => {
            let rows: Vec<TransactionByType> =
              load(&sync, resources::TRANSACTION_BY_TYPE, Params::new()).await?;
            aggregate::chart_series(&rows, &filter)
          }
        };
        print_series(&series);
        Ok(())
      }
      Command::Sales { group_by } => {
        let sync = self.connect()?;
        let sales: Vec<SalesAnalysis> = load(
          &sync,
          resources::SALES_ANALYSIS,
          resources::sales_params(&group_by),
        )
        .await?;
        for row in &sales {
          println!("{:<12} {:>12.2} {:>8.2}%", row.period, row.total_sales, row.percentage_change);
        }
        let summary = aggregate::sales_summary(&sales);
        println!("total {:.2}, average change {:.2}%", summary.total, summary.average_change);
        if let Some(peak) = summary.peak {
          println!("highest: {} ({:.2})", peak.period, peak.total_sales);
        }
        Ok(())
      }
      Command::Expenses => {
        let sync = self.connect()?;
        let expenses: Vec<ExpenseAnalysis> =
          load(&sync, resources::EXPENSE_ANALYSIS, Params::new()).await?;
        let breakdown = aggregate::expense_breakdown(&expenses);
        print_series(&breakdown.categories);
        println!("total {:.2}", breakdown.total);
        Ok(())
      }
      Command::Dashboard => {
        let sync = self.connect()?;
        self.dashboard(&sync).await
      }
      Command::Notifications { read } => {
        let sync = self.connect()?;
        self.notifications(&sync, read).await
      }
    }
  }

  async fn create_product(
    &self,
    sync: &FetchCoordinator,
    name: String,
    base_price: f64,
    rating: Option<f64>,
  ) -> Result<()> {
    // Hold the list so the mutation's invalidation refetches it.
    let mut list = sync.query(resources::PRODUCTS, Params::new())?;
    list.settled().await;

    let product = ProductCreate {
      name,
      base_price,
      rating,
    };
    let created = sync
      .mutate(inventory::create_product(&product))
      .await
      .map_err(|e| eyre!("Failed to create product: {}", e))?;
    let id = created.get("productId").and_then(|v| v.as_str()).unwrap_or("?");
    println!("created {}", id);

    let state = list.settled().await;
    let products: Vec<Product> = state
      .decode()
      .map_err(|e| eyre!("Failed to parse products: {}", e))?
      .unwrap_or_default();
    print_products(&products);
    Ok(())
  }

  async fn dashboard(&self, sync: &FetchCoordinator) -> Result<()> {
    let (stats, top, orders, purchases) = futures::try_join!(
      load::<StatisticAnalysis>(sync, resources::STATISTIC_ANALYSIS, Params::new()),
      load::<Vec<TopProduct>>(sync, resources::TOP_PRODUCTS, Params::new()),
      load::<OrderSummary>(sync, resources::ORDER_SUMMARY, Params::new()),
      load::<Vec<PurchaseAnalysis>>(sync, resources::PURCHASE_ANALYSIS, Params::new()),
    )?;

    println!(
      "sales     {:>12.2} ({:+.2}%)",
      stats.total_sales, stats.sales_change_percentage
    );
    println!(
      "purchases {:>12.2} ({:+.2}%)",
      stats.total_purchases, stats.purchases_change_percentage
    );
    println!(
      "expenses  {:>12.2} ({:+.2}%)",
      stats.total_expenses, stats.expenses_change_percentage
    );
    println!(
      "orders    {:>12} (avg discount {:.2})",
      orders.total_orders, orders.average_discount
    );
    let purchased: f64 = purchases.iter().map(|p| p.total_purchase_cost).sum();
    println!("purchase cost over period {:.2}", purchased);
    println!();
    println!("top products:");
    for product in top.iter().take(5) {
      println!(
        "  {:<30} {:>10.2} stock {}",
        product.name, product.base_price, product.stock_quantity
      );
    }
    Ok(())
  }

  async fn notifications(&self, sync: &FetchCoordinator, read: Option<u64>) -> Result<()> {
    let mut list = sync.query(resources::NOTIFICATIONS, Params::new())?;
    list.settled().await;

    if let Some(id) = read {
      sync
        .mutate(inventory::toggle_notification(id))
        .await
        .map_err(|e| eyre!("Failed to update notification {}: {}", id, e))?;
    }

    let state = list.settled().await;
    if let Some(err) = state.error.as_ref().filter(|_| state.is_error()) {
      return Err(eyre!("Failed to load notifications: {}", err.message));
    }
    let notes: Vec<Notification> = state
      .decode()
      .map_err(|e| eyre!("Failed to parse notifications: {}", e))?
      .unwrap_or_default();
    if !self.persistor.preferences().is_notification_on {
      println!("(notifications are muted)");
    }
    for note in &notes {
      let marker = if note.read { " " } else { "*" };
      println!("{} {:>5} {}  {}", marker, note.id, note.created_at, note.message);
    }
    Ok(())
  }

  async fn prefs(&self, action: PrefsAction) -> Result<()> {
    let prefs = match action {
      PrefsAction::Show => self.persistor.preferences(),
      PrefsAction::Set { key, value } => match key.as_str() {
        "sidebar-collapsed" => self.persistor.set_sidebar_collapsed(value).await,
        "dark-mode" => self.persistor.set_dark_mode(value).await,
        "notifications" => self.persistor.set_notification_on(value).await,
        other => return Err(eyre!("Unknown preference: {}", other)),
      },
    };
    let rendered = serde_json::to_string_pretty(&prefs)
      .map_err(|e| eyre!("Failed to render preferences: {}", e))?;
    println!("{}", rendered);
    if !self.persistor.is_durable() {
      println!("(not persisted)");
    }
    Ok(())
  }
}

/// Fetch one resource through the cache and decode it.
async fn load<T: DeserializeOwned>(
  sync: &FetchCoordinator,
  resource: &str,
  params: Params,
) -> Result<T> {
  let mut handle = sync.query(resource, params)?;
  let state = handle.settled().await;
  if let Some(err) = state.error.as_ref().filter(|_| state.is_error()) {
    return Err(eyre!("Failed to load {}: {}", resource, err.message));
  }
  state
    .decode()
    .map_err(|e| eyre!("Failed to parse {}: {}", resource, e))?
    .ok_or_else(|| eyre!("No data for {}", resource))
}

fn print_products(products: &[Product]) {
  for product in products {
    let rating = product
      .rating
      .map(|r| format!("{:.1}", r))
      .unwrap_or_else(|| "-".to_string());
    println!(
      "{:<12} {:<30} {:>10.2} {:>5}",
      product.product_id, product.name, product.base_price, rating
    );
  }
}

fn print_series(series: &[SeriesPoint]) {
  for point in series {
    println!("{:<24} {:>10.2} {}", point.name, point.amount, point.color);
  }
}
