pub mod receive_loop;
pub mod recv_window;
