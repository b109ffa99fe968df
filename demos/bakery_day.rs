//! 烘焙坊一日流程示例：接單 → 鎖定 → 計劃 → 工單 → 生產回報 → 補貨建議

use bakery::{
    Actor, BakeryEngine, Bom, BomLine, EngineConfig, FixedClock, OrderItem, OrderStatus, Product,
    RawMaterial, ReportProductionRequest, Role, UnitOfMeasure,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::sync::Arc;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    bakery::init_tracing("bakery=info,bakery_ledger=info,bakery_calc=info");
    println!("=== 烘焙坊一日流程示例 ===\n");

    let today = NaiveDate::from_ymd_opt(2025, 11, 7).ok_or("無效日期")?;
    let engine = BakeryEngine::new(EngineConfig::default(), Arc::new(FixedClock::on(today)))?;

    let manager = Actor::new("店長", Role::Manager);
    let sales = Actor::new("業務", Role::Sales);
    let baker = Actor::new("師傅", Role::Baker);

    // 1. 建立目錄與 BOM
    let bread = engine.register_product(
        Product::new("BREAD", "白吐司", UnitOfMeasure::Pcs, "Bread").with_shelf_life_days(3),
        &manager,
    )?;
    let flour = engine.register_material(
        RawMaterial::new("FLOUR", "高筋麵粉", UnitOfMeasure::Kg)
            .with_min_stock_level(Decimal::from(20))
            .with_reorder(Decimal::from(60), Some(Decimal::from(25)))
            .with_lead_time_days(2)
            .with_last_purchase_price(Decimal::new(38, 1)),
        &manager,
    )?;
    let butter = engine.register_material(
        RawMaterial::new("BUTTER", "無鹽奶油", UnitOfMeasure::Kg)
            .with_last_purchase_price(Decimal::new(210, 1)),
        &manager,
    )?;

    let bom = engine.create_bom_version(
        Bom::new(bread.id, Decimal::from(100))
            .with_yield_percentage(Decimal::from(95))
            .with_line(BomLine::new(flour.id, Decimal::from(50)).with_waste_percentage(Decimal::from(2)))
            .with_line(BomLine::new(butter.id, Decimal::from(4))),
        &manager,
    )?;
    engine.activate_bom(bom.id, &manager)?;

    engine.adjust_manual(flour.item_ref(), Decimal::from(80), "期初", &manager)?;
    engine.adjust_manual(butter.item_ref(), Decimal::from(10), "期初", &manager)?;

    // 2. 接單並鎖定
    let order = engine.create_order(
        "CAFE-01",
        today,
        vec![OrderItem::new(bread.id, Decimal::from(120))],
        &sales,
    )?;
    engine.transition_order_status(order.id, OrderStatus::Pending, &sales)?;
    engine.transition_order_status(order.id, OrderStatus::Confirmed, &sales)?;
    let order = engine.lock_order(order.id, &manager)?;
    println!("訂單 {} 已鎖定（{}）", order.order_number, order.status);

    // 3. 生產計劃
    let plan = engine.generate_plan(today)?;
    println!("\n生產計劃 {}:", plan.target_date);
    for demand in &plan.demands {
        println!(
            "  - {} 訂購 {}，庫存 {}，淨需求 {}",
            demand.product_code, demand.ordered_quantity, demand.on_hand, demand.net_to_produce
        );
    }
    for need in &plan.material_needs {
        println!(
            "  - 原料 {} 需求 {} {}，可用 {}，短缺 {}",
            need.material_code, need.needed, need.unit, need.available, need.shortage
        );
    }
    for alert in &plan.alerts {
        println!("  ! {}", alert.message);
    }

    // 4. 工單與生產回報
    let work_orders = engine.create_work_orders(&plan, &manager)?;
    for work_order in &work_orders {
        println!(
            "\n工單 {}（{}）",
            work_order.work_order_number, work_order.production_line
        );
        for item in &work_order.items {
            let report = engine.report_production(
                ReportProductionRequest::new(work_order.id, item.id, item.planned_quantity)
                    .with_waste(Decimal::from(2), "造型不良"),
                &baker,
            )?;
            println!(
                "  批號 {}，產出 {}，到期 {:?}",
                report.batch_number, report.produced_quantity, report.expiry_date
            );
            for consumed in &report.consumed_materials {
                println!(
                    "    耗用 {} {} {}",
                    consumed.material_code, consumed.quantity, consumed.unit
                );
            }
        }
        println!("  狀態: {}", engine.work_order(work_order.id)?.status);
    }

    // 5. 補貨建議
    println!("\n補貨建議:");
    for suggestion in engine.generate_reorder_suggestions()? {
        println!(
            "  - {} 可用 {}，建議採購 {}，預估成本 {}",
            suggestion.material_code,
            suggestion.current_available,
            suggestion.suggested_quantity,
            suggestion.estimated_cost
        );
    }

    let report = engine.reconcile();
    println!(
        "\n對帳：檢查 {} 項，差異 {} 項",
        report.items_checked,
        report.drifts.len()
    );

    Ok(())
}
