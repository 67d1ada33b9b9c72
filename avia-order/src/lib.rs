pub mod models;
pub mod status;
pub mod repository;
pub mod ticket_number;
pub mod checkout;
pub mod changes;

pub use models::{
    CartItem, CartLine, IssuedTicket, NewCartItem, NewOrder, NewTicket, Order, OrderOverview,
    OrderStatus, OrderSummary, Ticket, REFUND_PROCESSED,
};
pub use status::{OrderError, OrderStateMachine, StatusChangeRequest, TransitionPlan};
pub use repository::{BookingStore, BookingTx};
pub use ticket_number::TicketNumberGenerator;
pub use checkout::{CheckoutError, CheckoutWorkflow};
pub use changes::{Actor, ChangeHandler};
