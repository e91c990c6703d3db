//! Typed record loading at the ingestion boundary
//!
//! Reads transaction and product attribute exports into validated records.
//! Anything malformed is a `DataIntegrity` error naming the offending row;
//! nothing downstream ever sees a partially-filled record.

use crate::error::{Result, ShelfwiseError};
use crate::types::{ProductAttributes, Transaction};
use std::collections::HashSet;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

/// Load and validate transactions from a CSV file
pub fn load_transactions(path: &Path) -> Result<Vec<Transaction>> {
    let file = std::fs::File::open(path).map_err(|e| {
        ShelfwiseError::Io(std::io::Error::new(
            e.kind(),
            format!("Failed to open {}: {}", path.display(), e),
        ))
    })?;
    let transactions = read_transactions(file)?;
    info!(
        "Loaded {} transactions from {}",
        transactions.len(),
        path.display()
    );
    Ok(transactions)
}

/// Load and validate product attributes from a CSV file
pub fn load_products(path: &Path) -> Result<Vec<ProductAttributes>> {
    let file = std::fs::File::open(path).map_err(|e| {
        ShelfwiseError::Io(std::io::Error::new(
            e.kind(),
            format!("Failed to open {}: {}", path.display(), e),
        ))
    })?;
    let products = read_products(file)?;
    info!("Loaded {} products from {}", products.len(), path.display());
    Ok(products)
}

/// Decode transactions from any CSV source
pub fn read_transactions<R: Read>(source: R) -> Result<Vec<Transaction>> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(source);
    let mut transactions = Vec::new();

    for (row, record) in reader.deserialize::<Transaction>().enumerate() {
        // Header is line 1
        let line = row + 2;
        let transaction = record.map_err(|e| {
            ShelfwiseError::integrity(format!("transactions line {}", line), e.to_string())
        })?;
        transaction.validate()?;
        transactions.push(transaction);
    }

    debug!("Decoded {} transaction rows", transactions.len());
    Ok(transactions)
}

/// Decode product attributes from any CSV source
pub fn read_products<R: Read>(source: R) -> Result<Vec<ProductAttributes>> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(source);
    let mut products = Vec::new();
    let mut seen = HashSet::new();

    for (row, record) in reader.deserialize::<ProductAttributes>().enumerate() {
        let line = row + 2;
        let product = record.map_err(|e| {
            ShelfwiseError::integrity(format!("products line {}", line), e.to_string())
        })?;
        product.validate()?;
        if !seen.insert(product.product_id) {
            return Err(ShelfwiseError::integrity(
                format!("products line {}", line),
                format!("duplicate product {}", product.product_id),
            ));
        }
        products.push(product);
    }

    debug!("Decoded {} product rows", products.len());
    Ok(products)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const TRANSACTIONS: &str = "\
household_key,BASKET_ID,DAY,PRODUCT_ID,QUANTITY,SALES_VALUE,STORE_ID,WEEK_NO
2375,26984851472,1,1004906,1,1.39,364,1
2375,26984851472,1,1033142,1,0.82,364,1
1364,26984896261,1,842930,1,2.19,31742,2
";

    const PRODUCTS: &str = "\
PRODUCT_ID,MANUFACTURER,DEPARTMENT,BRAND,COMMODITY_DESC,SUB_COMMODITY_DESC,CURR_SIZE_OF_PRODUCT
1004906,69,PRODUCE,Private,POTATOES,POTATOES RUSSET (BULK&BAG),5 LB
1033142,2,PRODUCE,National,ONIONS,ONIONS SWEET (BULK&BAG),40 OZ
";

    #[test]
    fn test_reads_export_columns_and_ignores_extras() {
        let transactions = read_transactions(TRANSACTIONS.as_bytes()).unwrap();
        assert_eq!(transactions.len(), 3);
        assert_eq!(transactions[0].household_id, 2375);
        assert_eq!(transactions[0].product_id, 1004906);
        assert_eq!(transactions[2].week, 2);
        assert!((transactions[1].sales_value - 0.82).abs() < 1e-9);

        let products = read_products(PRODUCTS.as_bytes()).unwrap();
        assert_eq!(products.len(), 2);
        assert_eq!(products[0].manufacturer, "69");
        assert_eq!(products[1].subcommodity, "ONIONS SWEET (BULK&BAG)");
    }

    #[test]
    fn test_malformed_row_is_integrity_error() {
        let bad = "household_key,PRODUCT_ID,QUANTITY,SALES_VALUE,WEEK_NO\n1,abc,1,2.0,3\n";
        let err = read_transactions(bad.as_bytes()).unwrap_err();
        assert!(matches!(err, ShelfwiseError::DataIntegrity { .. }));
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_negative_sales_rejected() {
        let bad = "household_key,PRODUCT_ID,QUANTITY,SALES_VALUE,WEEK_NO\n1,5,1,-2.0,3\n";
        assert!(matches!(
            read_transactions(bad.as_bytes()),
            Err(ShelfwiseError::DataIntegrity { .. })
        ));
    }

    #[test]
    fn test_duplicate_product_rejected() {
        let dup = format!("{}1004906,69,PRODUCE,Private,POTATOES,RUSSET,5 LB\n", PRODUCTS);
        let err = read_products(dup.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("duplicate product 1004906"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().expect("temp file");
        write!(file, "{}", TRANSACTIONS).expect("write rows");

        let transactions = load_transactions(file.path()).unwrap();
        assert_eq!(transactions.len(), 3);

        let missing = load_products(Path::new("/nonexistent/product.csv"));
        assert!(matches!(missing, Err(ShelfwiseError::Io(_))));
    }
}
