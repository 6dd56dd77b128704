use common::{App, Emit, Result};
use csv::{ReaderBuilder, StringRecord, Trim};
use eyre::{bail, WrapErr};
use itertools::Itertools;
use log::warn;
use regex::Regex;

const COLUMNS: [&str; 5] = ["product", "quantity", "price", "region", "date"];

#[derive(Debug, Clone, PartialEq)]
pub struct Sale {
    pub product: String,
    pub quantity: i64,
    pub price: f64,
    pub region: String,
    pub date: Option<String>,
    pub total: f64,
}

impl Sale {
    pub fn new(product: &str, quantity: i64, price: f64, region: &str, date: Option<&str>) -> Self {
        Self {
            product: product.to_owned(),
            quantity,
            price,
            region: region.to_owned(),
            date: date.map(str::to_owned),
            total: quantity as f64 * price,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupBy {
    Product,
    Region,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Measure {
    Total,
    Quantity,
}

/// Sums one measure of every sale per product or per region.
#[derive(Debug, Clone, Copy)]
pub struct SalesApp {
    pub group_by: GroupBy,
    pub measure: Measure,
}

impl SalesApp {
    pub fn new(group_by: GroupBy, measure: Measure) -> Self {
        Self { group_by, measure }
    }
}

impl Default for SalesApp {
    fn default() -> Self {
        Self::new(GroupBy::Product, Measure::Total)
    }
}

impl App for SalesApp {
    type Record = Sale;
    type Key = String;
    type Value = f64;
    type Output = f64;

    fn map(&self, sale: &Sale, _position: usize) -> Result<Emit<String, f64>> {
        let key = match self.group_by {
            GroupBy::Product => &sale.product,
            GroupBy::Region => &sale.region,
        };
        let value = match self.measure {
            Measure::Total => sale.total,
            Measure::Quantity => sale.quantity as f64,
        };
        Ok(Emit::Single(key.clone(), value))
    }

    fn reduce(&self, _key: &String, values: &[f64]) -> Result<f64> {
        Ok(values.iter().sum())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SalesReport {
    pub product_sales: Vec<(String, f64)>,
    pub region_sales: Vec<(String, f64)>,
    pub product_quantity: Vec<(String, f64)>,
    pub total_sales: f64,
    pub total_quantity: i64,
    pub total_transactions: usize,
    pub unique_products: usize,
    pub unique_regions: usize,
    pub average_transaction: f64,
}

pub fn analyze(sales: &[Sale]) -> Result<SalesReport> {
    let product_sales = engine::run(&SalesApp::new(GroupBy::Product, Measure::Total), sales)?;
    let region_sales = engine::run(&SalesApp::new(GroupBy::Region, Measure::Total), sales)?;
    let product_quantity = engine::run(&SalesApp::new(GroupBy::Product, Measure::Quantity), sales)?;

    let total_sales = sales.iter().map(|s| s.total).sum::<f64>();
    let total_transactions = sales.len();
    Ok(SalesReport {
        unique_products: product_sales.results.len(),
        unique_regions: region_sales.results.len(),
        product_sales: product_sales.results,
        region_sales: region_sales.results,
        product_quantity: product_quantity.results,
        total_sales,
        total_quantity: sales.iter().map(|s| s.quantity).sum(),
        total_transactions,
        average_transaction: if total_transactions > 0 {
            total_sales / total_transactions as f64
        } else {
            0.0
        },
    })
}

/// Analyses headerless `product,quantity,price,region,date` lines.
pub fn sales_analysis<S: AsRef<str>>(lines: &[S]) -> Result<SalesReport> {
    analyze(&parse_lines(lines)?)
}

struct Numbers {
    int: Regex,
    float: Regex,
}

impl Numbers {
    fn new() -> Result<Self> {
        Ok(Self {
            int: Regex::new(r"^[+-]?\d+")?,
            float: Regex::new(r"^[+-]?(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?")?,
        })
    }

    /// Leading integer of `s`, ignoring whatever follows it.
    fn int(&self, s: &str) -> Option<i64> {
        self.int.find(s).and_then(|m| m.as_str().parse().ok())
    }

    /// Leading decimal number of `s`, ignoring whatever follows it.
    fn float(&self, s: &str) -> Option<f64> {
        self.float.find(s).and_then(|m| m.as_str().parse().ok())
    }
}

fn reader(text: &str, has_headers: bool) -> csv::Reader<&[u8]> {
    ReaderBuilder::new()
        .has_headers(has_headers)
        .flexible(true)
        .quoting(false)
        .trim(Trim::All)
        .from_reader(text.as_bytes())
}

/// Lenient parse: numbers that do not parse count as zero and rows without a
/// product or a region are dropped.
pub fn parse_lines<S: AsRef<str>>(lines: &[S]) -> Result<Vec<Sale>> {
    let numbers = Numbers::new()?;
    let text = lines.iter().map(|line| line.as_ref()).join("\n");
    let mut sales = Vec::new();
    for record in reader(&text, false).records() {
        let record = record.wrap_err("malformed sales line")?;
        let field = |i: usize| record.get(i).filter(|f| !f.is_empty());
        let (product, region) = match (field(0), field(3)) {
            (Some(product), Some(region)) => (product, region),
            _ => continue,
        };
        sales.push(Sale::new(
            product,
            field(1).and_then(|q| numbers.int(q)).unwrap_or(0),
            field(2).and_then(|p| numbers.float(p)).unwrap_or(0.0),
            region,
            field(4),
        ));
    }
    Ok(sales)
}

fn is_valid_date(date: &str, pattern: &Regex) -> bool {
    let caps = match pattern.captures(date) {
        Some(caps) => caps,
        None => return false,
    };
    let (year, month, day): (u32, u32, u32) = match (caps[1].parse(), caps[2].parse(), caps[3].parse()) {
        (Ok(y), Ok(m), Ok(d)) => (y, m, d),
        _ => return false,
    };
    let leap = (year % 4 == 0 && year % 100 != 0) || year % 400 == 0;
    let days = match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if leap => 29,
        2 => 28,
        _ => return false,
    };
    (1..=days).contains(&day)
}

/// Strict parse of a CSV export with a header row naming at least
/// `product,quantity,price,region,date` in any order.
///
/// Rows with the wrong number of columns, unparsable numbers or an invalid
/// `YYYY-MM-DD` date are skipped with a warning. Fails when a column is
/// missing or when no row survives.
pub fn parse_csv(text: &str) -> Result<Vec<Sale>> {
    if text.trim().is_empty() {
        bail!("sales data is empty");
    }

    let numbers = Numbers::new()?;
    let date_pattern = Regex::new(r"^(\d{4})-(\d{2})-(\d{2})$")?;
    let mut reader = reader(text, true);
    let headers = reader.headers().wrap_err("failed to read sales header")?.clone();

    let missing = COLUMNS
        .iter()
        .filter(|column| !headers.iter().any(|h| h == **column))
        .collect_vec();
    if !missing.is_empty() {
        bail!("missing sales columns: {}", missing.iter().join(", "));
    }
    let index = |column: &str| headers.iter().position(|h| h == column);

    let mut sales = Vec::new();
    for (i, record) in reader.records().enumerate() {
        // header is line 1
        let line = i + 2;
        let record: StringRecord = record.wrap_err_with(|| format!("malformed sales line {}", line))?;
        if record.len() != headers.len() {
            warn!("line {} skipped: expected {} columns", line, headers.len());
            continue;
        }
        let get = |column: &str| index(column).and_then(|i| record.get(i)).unwrap_or("");

        let (quantity, price) = match (numbers.int(get("quantity")), numbers.float(get("price"))) {
            (Some(quantity), Some(price)) => (quantity, price),
            _ => {
                warn!("line {} skipped: invalid quantity or price", line);
                continue;
            }
        };
        let date = get("date");
        if !is_valid_date(date, &date_pattern) {
            warn!("line {} skipped: invalid date {:?}", line, date);
            continue;
        }
        sales.push(Sale::new(get("product"), quantity, price, get("region"), Some(date)));
    }

    if sales.is_empty() {
        bail!("no valid sales rows");
    }
    Ok(sales)
}
