//! Composite resolver: flattens cart lines into the product deductions the
//! stock ledger applies.

use crate::error::{LedgerError, Result};
use crate::models::{CartLine, Deduction, StockLine};

/// Expand every line. A bouquet contributes its components, each scaled by
/// the number of bouquets sold; a simple line contributes itself.
pub fn resolve(lines: &[CartLine]) -> Result<Vec<Deduction>> {
    let mut deductions = Vec::new();

    for line in lines {
        match line {
            CartLine::Simple(simple) => {
                if simple.quantity <= 0 {
                    return Err(LedgerError::invalid_quantity(
                        format!("product {}", simple.product_id),
                        simple.quantity,
                    ));
                }
                deductions.push(Deduction {
                    product_id: simple.product_id,
                    quantity: simple.quantity,
                    display_name: simple
                        .name
                        .clone()
                        .unwrap_or_else(|| format!("product {}", simple.product_id)),
                });
            }
            CartLine::Composite(bundle) => {
                if bundle.quantity <= 0 {
                    return Err(LedgerError::invalid_quantity(
                        format!("bouquet {}", bundle.name),
                        bundle.quantity,
                    ));
                }
                if bundle.components.is_empty() {
                    return Err(LedgerError::Validation(format!(
                        "bouquet {} has no components",
                        bundle.name
                    )));
                }
                for component in &bundle.components {
                    if component.quantity <= 0 {
                        return Err(LedgerError::invalid_quantity(
                            format!("component {} of {}", component.product_id, bundle.name),
                            component.quantity,
                        ));
                    }
                    let quantity = component
                        .quantity
                        .checked_mul(bundle.quantity)
                        .ok_or_else(|| {
                            LedgerError::invalid_quantity(bundle.name.clone(), bundle.quantity)
                        })?;
                    let component_name = component
                        .name
                        .clone()
                        .unwrap_or_else(|| format!("product {}", component.product_id));
                    deductions.push(Deduction {
                        product_id: component.product_id,
                        quantity,
                        display_name: format!("{component_name} ({})", bundle.name),
                    });
                }
            }
        }
    }

    Ok(deductions)
}

/// Receipt copy of the cart. Composite lines lose any product id the
/// register sent, so nothing downstream mistakes a bouquet for a stock row.
pub fn receipt_lines(lines: &[CartLine]) -> Vec<CartLine> {
    lines
        .iter()
        .cloned()
        .map(|line| match line {
            CartLine::Composite(mut bundle) => {
                bundle.product_id = None;
                CartLine::Composite(bundle)
            }
            simple => simple,
        })
        .collect()
}

pub fn to_stock_lines(deductions: &[Deduction]) -> Vec<StockLine> {
    deductions
        .iter()
        .map(|d| StockLine {
            product_id: d.product_id,
            quantity: d.quantity,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Component, CompositeLine, SimpleLine};

    fn bouquet(quantity: i64) -> CartLine {
        CartLine::Composite(CompositeLine {
            product_id: Some(99),
            name: "Spring Bouquet".into(),
            quantity,
            price: 45.0,
            components: vec![
                Component {
                    product_id: 1,
                    name: Some("Tulip".into()),
                    quantity: 2,
                },
                Component {
                    product_id: 2,
                    name: None,
                    quantity: 1,
                },
            ],
        })
    }

    #[test]
    fn composite_expands_to_components() {
        let deductions = resolve(&[bouquet(1)]).unwrap();
        assert_eq!(deductions.len(), 2);
        assert_eq!((deductions[0].product_id, deductions[0].quantity), (1, 2));
        assert_eq!((deductions[1].product_id, deductions[1].quantity), (2, 1));
        assert!(deductions.iter().all(|d| d.product_id != 99));
        assert_eq!(deductions[0].display_name, "Tulip (Spring Bouquet)");
    }

    #[test]
    fn composite_components_scale_with_bouquet_count() {
        let deductions = resolve(&[bouquet(3)]).unwrap();
        assert_eq!(deductions[0].quantity, 6);
        assert_eq!(deductions[1].quantity, 3);
    }

    #[test]
    fn simple_line_passes_through() {
        let line = CartLine::Simple(SimpleLine {
            product_id: 7,
            name: Some("Sunflower".into()),
            quantity: 4,
            price: 3.0,
        });
        let deductions = resolve(&[line]).unwrap();
        assert_eq!(
            deductions,
            vec![Deduction {
                product_id: 7,
                quantity: 4,
                display_name: "Sunflower".into(),
            }]
        );
    }

    #[test]
    fn receipt_nulls_bouquet_product_id() {
        let receipt = receipt_lines(&[bouquet(1)]);
        match &receipt[0] {
            CartLine::Composite(bundle) => assert_eq!(bundle.product_id, None),
            other => panic!("unexpected line {other:?}"),
        }
    }

    #[test]
    fn empty_bouquet_is_rejected() {
        let line = CartLine::Composite(CompositeLine {
            product_id: None,
            name: "Empty".into(),
            quantity: 1,
            price: 10.0,
            components: Vec::new(),
        });
        assert!(matches!(resolve(&[line]), Err(LedgerError::Validation(_))));
    }

    #[test]
    fn cart_json_uses_kind_tag() {
        let json = r#"[
            {"kind": "simple", "productId": 3, "quantity": 2, "price": 1.5},
            {"kind": "composite", "productId": 12, "name": "Rose Dozen", "price": 60.0,
             "components": [{"productId": 3, "quantity": 12}]}
        ]"#;
        let lines: Vec<CartLine> = serde_json::from_str(json).unwrap();
        assert_eq!(lines[1].quantity(), 1);

        let deductions = resolve(&lines).unwrap();
        let total: i64 = deductions
            .iter()
            .filter(|d| d.product_id == 3)
            .map(|d| d.quantity)
            .sum();
        assert_eq!(total, 14);
    }
}
