//! End-to-end approval workflow over the public API

use shared::models::{ApprovalMode, DiningTable, Product, StoreSettings};
use shared::order::{ApprovalStatus, OrderStatus};
use table_server::carts::CartError;
use table_server::feed::ChangeFeed;
use table_server::orders::OrderError;
use table_server::{CartStore, OrderService, SessionManager, SessionStorage};

struct World {
    storage: SessionStorage,
    sessions: SessionManager,
    carts: CartStore,
    orders: OrderService,
    table: DiningTable,
    burger: Product,
    juice: Product,
}

fn world(mode: ApprovalMode) -> World {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let storage = SessionStorage::open_in_memory().unwrap();
    storage
        .put_settings(&StoreSettings {
            order_approval_mode: mode,
            delivery_fee_cents: 0,
        })
        .unwrap();

    let table = DiningTable::new("Mesa 7");
    storage.insert_table(&table).unwrap();
    let burger = Product::new("X-Burger", 2500);
    let juice = Product::new("Suco de Laranja", 900);
    storage.upsert_product(&burger).unwrap();
    storage.upsert_product(&juice).unwrap();

    let feed = ChangeFeed::new();
    World {
        sessions: SessionManager::new(storage.clone(), feed.clone()),
        carts: CartStore::new(storage.clone(), feed.clone()),
        orders: OrderService::new(storage.clone(), feed),
        storage,
        table,
        burger,
        juice,
    }
}

#[test]
fn host_gated_submission_approval_and_fulfillment() {
    let w = world(ApprovalMode::Host);
    let (session, host) = w.sessions.join_table(&w.table.token, "Ana").unwrap();
    let (_, bruno) = w.sessions.join_table(&w.table.token, "Bruno").unwrap();

    // Bruno builds a cart and submits; HOST mode gates him
    w.carts
        .increment(session.id, bruno.id, w.burger.id, 2, None)
        .unwrap();
    let order = w.orders.submit_guest_order(session.id, bruno.id).unwrap();
    assert_eq!(order.approval_status, ApprovalStatus::PendingApproval);
    assert_eq!(order.status, OrderStatus::Pending);

    // While pending, Bruno can neither mutate his cart nor resubmit
    let err = w
        .carts
        .increment(session.id, bruno.id, w.juice.id, 1, None)
        .unwrap_err();
    assert!(matches!(err, CartError::ApprovalPending(_)));
    let err = w.orders.submit_guest_order(session.id, bruno.id).unwrap_err();
    assert!(matches!(err, OrderError::ApprovalPending(_)));

    // Ana (host) approves: kitchen queue entry, Bruno's cart consumed
    let approved = w.orders.approve(order.id, host.id).unwrap();
    assert_eq!(approved.approval_status, ApprovalStatus::Approved);
    assert_eq!(approved.status, OrderStatus::Pending);
    assert!(w
        .carts
        .lines_for_guest(session.id, bruno.id)
        .unwrap()
        .is_empty());

    // Fulfillment proceeds along the chain
    w.orders.transition(order.id, OrderStatus::Preparing).unwrap();
    w.orders.transition(order.id, OrderStatus::Ready).unwrap();
    let finished = w.orders.transition(order.id, OrderStatus::Finished).unwrap();
    assert!(finished.status.is_terminal());

    // The receipt reflects the approved order
    let token = w.storage.ensure_receipt_token(session.id).unwrap();
    let receipt = w.storage.get_public_receipt(&token).unwrap();
    assert_eq!(receipt.total_cents, 5000);
    assert_eq!(receipt.lines.len(), 1);
    assert_eq!(receipt.lines[0].qty, 2);
}

#[test]
fn rejection_is_final_and_unblocks_the_guest() {
    let w = world(ApprovalMode::Host);
    let (session, host) = w.sessions.join_table(&w.table.token, "Ana").unwrap();
    let (_, bruno) = w.sessions.join_table(&w.table.token, "Bruno").unwrap();

    w.carts
        .increment(session.id, bruno.id, w.juice.id, 3, None)
        .unwrap();
    let order = w.orders.submit_guest_order(session.id, bruno.id).unwrap();

    let rejected = w.orders.reject(order.id, host.id).unwrap();
    assert_eq!(rejected.approval_status, ApprovalStatus::Rejected);
    assert_eq!(rejected.status, OrderStatus::Cancelled);

    // Rejection leaves the cart untouched and lifts the block
    assert_eq!(w.carts.lines_for_guest(session.id, bruno.id).unwrap().len(), 1);
    let resubmitted = w.orders.submit_guest_order(session.id, bruno.id).unwrap();
    assert_eq!(resubmitted.approval_status, ApprovalStatus::PendingApproval);
    assert_ne!(resubmitted.id, order.id);

    // The rejected order never resurfaces
    let err = w.orders.approve(order.id, host.id).unwrap_err();
    assert!(matches!(err, OrderError::AlreadyResolved(_)));
    let err = w.orders.transition(order.id, OrderStatus::Preparing).unwrap_err();
    assert!(matches!(err, OrderError::OrderImmutable(_)));
}

#[test]
fn guests_carts_are_isolated_through_the_whole_flow() {
    let w = world(ApprovalMode::SelfService);
    let (session, ana) = w.sessions.join_table(&w.table.token, "Ana").unwrap();
    let (_, bruno) = w.sessions.join_table(&w.table.token, "Bruno").unwrap();

    w.carts
        .increment(session.id, ana.id, w.burger.id, 1, None)
        .unwrap();
    w.carts
        .increment(session.id, bruno.id, w.juice.id, 2, None)
        .unwrap();

    // Ana submits; only her lines are consumed
    w.orders.submit_guest_order(session.id, ana.id).unwrap();
    assert!(w.carts.lines_for_guest(session.id, ana.id).unwrap().is_empty());
    assert_eq!(w.carts.lines_for_guest(session.id, bruno.id).unwrap().len(), 1);

    // Bruno cannot remove lines he does not own
    w.carts
        .increment(session.id, ana.id, w.burger.id, 1, None)
        .unwrap();
    let ana_line = w.carts.lines_for_guest(session.id, ana.id).unwrap()[0].id;
    let err = w.carts.remove_line(session.id, bruno.id, ana_line).unwrap_err();
    assert!(matches!(err, CartError::NotLineOwner { .. }));
}

#[test]
fn staff_close_out_expires_the_session_and_blocks_everyone() {
    let w = world(ApprovalMode::SelfService);
    let (session, ana) = w.sessions.join_table(&w.table.token, "Ana").unwrap();
    w.carts
        .increment(session.id, ana.id, w.burger.id, 1, None)
        .unwrap();

    w.sessions.force_close(session.id).unwrap();

    let err = w
        .carts
        .increment(session.id, ana.id, w.burger.id, 1, None)
        .unwrap_err();
    assert!(matches!(err, CartError::SessionExpired(_)));
    let err = w.orders.submit_guest_order(session.id, ana.id).unwrap_err();
    assert!(matches!(err, OrderError::SessionExpired(_)));

    // The table is free for the next party
    let (fresh, host) = w.sessions.join_table(&w.table.token, "Caio").unwrap();
    assert_ne!(fresh.id, session.id);
    assert!(host.is_host);
}
