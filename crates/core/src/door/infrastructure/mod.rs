pub mod serialport_channel;
