//! Kitchen ticket builder
//!
//! A ticket covers a session's root order plus the rounds linked to it via
//! `parent_order_id`, with lines merged by the grouping rules so the
//! kitchen never sees the same item twice. Printing goes through the
//! idempotent mark-printed procedure: an order contributes to at most one
//! printed ticket.

use shared::order::{ApprovalStatus, Order, OrderStatus};
use tracing::info;

use super::{OrderResult, OrderService};
use crate::grouping::{self, GroupedLine};

/// A grouped, print-ready kitchen ticket
#[derive(Debug, Clone)]
pub struct KitchenTicket {
    pub root_order_id: i64,
    pub session_id: i64,
    pub table_id: Option<i64>,
    /// Orders whose lines this ticket carries
    pub order_ids: Vec<i64>,
    pub lines: Vec<GroupedLine>,
}

impl OrderService {
    /// Build the full ticket for a root order and all its rounds.
    ///
    /// Accepts any order of the chain and resolves to the root. Only
    /// approved, non-cancelled orders contribute.
    pub fn build_kitchen_ticket(&self, order_id: i64) -> OrderResult<KitchenTicket> {
        let (root, rounds) = self.ticket_orders(order_id)?;
        Ok(make_ticket(&root, &rounds))
    }

    /// Print the ticket: only orders not yet printed contribute, and they
    /// are marked printed in the same call. Returns None when every order
    /// of the chain was already printed.
    pub fn print_kitchen_ticket(&self, order_id: i64) -> OrderResult<Option<KitchenTicket>> {
        let (root, rounds) = self.ticket_orders(order_id)?;
        let unprinted: Vec<Order> = rounds
            .into_iter()
            .filter(|o| o.printed_at.is_none())
            .collect();
        if unprinted.is_empty() {
            return Ok(None);
        }

        let ids: Vec<i64> = unprinted.iter().map(|o| o.id).collect();
        let newly_printed = self.storage.mark_orders_printed(&ids)?;
        // A concurrent printer may have claimed some orders between the
        // read and the mark; trust the procedure's answer
        let claimed: Vec<Order> = unprinted
            .into_iter()
            .filter(|o| newly_printed.contains(&o.id))
            .collect();
        if claimed.is_empty() {
            return Ok(None);
        }

        let ticket = make_ticket(&root, &claimed);
        info!(
            root_order_id = ticket.root_order_id,
            orders = ticket.order_ids.len(),
            lines = ticket.lines.len(),
            "kitchen ticket printed"
        );
        Ok(Some(ticket))
    }

    /// Resolve the root and collect the chain's printable orders
    fn ticket_orders(&self, order_id: i64) -> OrderResult<(Order, Vec<Order>)> {
        let mut root = self.storage.require_order(order_id)?;
        if let Some(parent_id) = root.parent_order_id {
            root = self.storage.require_order(parent_id)?;
        }
        let rounds: Vec<Order> = self
            .storage
            .orders_for_session(root.session_id)?
            .into_iter()
            .filter(|o| o.id == root.id || o.parent_order_id == Some(root.id))
            .filter(|o| {
                o.approval_status == ApprovalStatus::Approved
                    && o.status != OrderStatus::Cancelled
            })
            .collect();
        Ok((root, rounds))
    }
}

fn make_ticket(root: &Order, orders: &[Order]) -> KitchenTicket {
    let all_items: Vec<_> = orders.iter().flat_map(|o| o.items.clone()).collect();
    KitchenTicket {
        root_order_id: root.id,
        session_id: root.session_id,
        table_id: root.table_id,
        order_ids: orders.iter().map(|o| o.id).collect(),
        lines: grouping::group(&all_items),
    }
}
